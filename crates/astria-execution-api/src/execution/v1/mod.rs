use pbjson_types::Timestamp;

use crate::{
    generated::astria::execution::v1 as raw,
    primitive::v1::{
        IncorrectRollupIdLength,
        RollupId,
    },
    Protobuf,
};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct BlockError(BlockErrorKind);

impl BlockError {
    fn field_not_set(field: &'static str) -> Self {
        Self(BlockErrorKind::FieldNotSet(field))
    }

    fn incorrect_block_hash_length(wrong_hash: &[u8]) -> Self {
        Self(BlockErrorKind::IncorrectBlockHashLength(wrong_hash.len()))
    }

    fn incorrect_parent_block_hash_length(wrong_hash: &[u8]) -> Self {
        Self(BlockErrorKind::IncorrectParentBlockHashLength(
            wrong_hash.len(),
        ))
    }
}

#[derive(Debug, thiserror::Error)]
enum BlockErrorKind {
    #[error("{0} field not set")]
    FieldNotSet(&'static str),
    #[error(".hash field contained wrong number of bytes; expected 32, got {0}")]
    IncorrectBlockHashLength(usize),
    #[error(".parent_block_hash field contained wrong number of bytes; expected 32, got {0}")]
    IncorrectParentBlockHashLength(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    /// The block number
    number: u32,
    /// The hash of the block
    hash: [u8; 32],
    /// The hash from the parent block
    parent_block_hash: [u8; 32],
    /// Timestamp on the block, standardized to google protobuf standard.
    timestamp: Timestamp,
}

impl Block {
    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[must_use]
    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    #[must_use]
    pub fn parent_block_hash(&self) -> [u8; 32] {
        self.parent_block_hash
    }

    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        // pbjson_types::Timestamp is a (i64, i32) tuple, so this is
        // effectively just a copy
        self.timestamp.clone()
    }
}

impl Protobuf for Block {
    type Error = BlockError;
    type Raw = raw::Block;

    fn try_from_raw_ref(raw: &Self::Raw) -> Result<Self, Self::Error> {
        let raw::Block {
            number,
            hash,
            parent_block_hash,
            timestamp,
        } = raw;
        let hash = hash
            .as_ref()
            .try_into()
            .map_err(|_| Self::Error::incorrect_block_hash_length(hash))?;
        let parent_block_hash = parent_block_hash
            .as_ref()
            .try_into()
            .map_err(|_| Self::Error::incorrect_parent_block_hash_length(parent_block_hash))?;

        // Clone'ing timestamp is effectively a copy because timestamp is just a (i32, i64) tuple
        let timestamp = timestamp
            .clone()
            .ok_or(Self::Error::field_not_set(".timestamp"))?;

        Ok(Self {
            number: *number,
            hash,
            parent_block_hash,
            timestamp,
        })
    }

    fn to_raw(&self) -> Self::Raw {
        let Self {
            number,
            hash,
            parent_block_hash,
            timestamp,
        } = self;
        Self::Raw {
            number: *number,
            hash: hash.to_vec().into(),
            parent_block_hash: parent_block_hash.to_vec().into(),
            // Clone'ing timestamp is effectively a copy because timestamp is just a (i32, i64)
            // tuple
            timestamp: Some(timestamp.clone()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct CommitmentStateError(CommitmentStateErrorKind);

impl CommitmentStateError {
    fn field_not_set(field: &'static str) -> Self {
        Self(CommitmentStateErrorKind::FieldNotSet(field))
    }

    fn firm(source: BlockError) -> Self {
        Self(CommitmentStateErrorKind::Firm(source))
    }

    fn soft(source: BlockError) -> Self {
        Self(CommitmentStateErrorKind::Soft(source))
    }

    fn firm_exceeds_soft(firm: u32, soft: u32) -> Self {
        Self(CommitmentStateErrorKind::FirmExceedsSoft {
            firm,
            soft,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum CommitmentStateErrorKind {
    #[error("{0} field not set")]
    FieldNotSet(&'static str),
    #[error(".firm field did not contain a valid block")]
    Firm(#[source] BlockError),
    #[error(".soft field did not contain a valid block")]
    Soft(#[source] BlockError),
    #[error("firm commitment at number {firm} exceeds soft commitment at number {soft}")]
    FirmExceedsSoft { firm: u32, soft: u32 },
}

/// The CommitmentState holds the block at each stage of sequencer commitment
/// level
///
/// A Valid CommitmentState:
/// - Block numbers are such that soft >= firm.
/// - No blocks ever decrease in block number.
/// - The chain defined by soft is the head of the canonical chain the firm block must belong to.
#[derive(Clone, Debug, PartialEq)]
pub struct CommitmentState {
    /// Soft commitment is the rollup block matching latest sequencer block.
    soft: Block,
    /// Firm commitment is achieved when data has been seen in DA.
    firm: Block,
    /// The lowest height of the DA chain that will be searched for the next
    /// firm block.
    base_celestia_height: u64,
}

impl CommitmentState {
    #[must_use]
    pub fn firm(&self) -> &Block {
        &self.firm
    }

    #[must_use]
    pub fn soft(&self) -> &Block {
        &self.soft
    }

    #[must_use]
    pub fn base_celestia_height(&self) -> u64 {
        self.base_celestia_height
    }
}

impl Protobuf for CommitmentState {
    type Error = CommitmentStateError;
    type Raw = raw::CommitmentState;

    fn try_from_raw_ref(raw: &Self::Raw) -> Result<Self, Self::Error> {
        let Self::Raw {
            soft,
            firm,
            base_celestia_height,
        } = raw;
        let soft = 'soft: {
            let Some(soft) = soft else {
                break 'soft Err(Self::Error::field_not_set(".soft"));
            };
            Block::try_from_raw_ref(soft).map_err(Self::Error::soft)
        }?;
        let firm = 'firm: {
            let Some(firm) = firm else {
                break 'firm Err(Self::Error::field_not_set(".firm"));
            };
            Block::try_from_raw_ref(firm).map_err(Self::Error::firm)
        }?;
        if firm.number() > soft.number() {
            return Err(Self::Error::firm_exceeds_soft(firm.number(), soft.number()));
        }
        Ok(Self {
            soft,
            firm,
            base_celestia_height: *base_celestia_height,
        })
    }

    fn to_raw(&self) -> Self::Raw {
        let Self {
            soft,
            firm,
            base_celestia_height,
        } = self;
        let soft = soft.to_raw();
        let firm = firm.to_raw();
        Self::Raw {
            soft: Some(soft),
            firm: Some(firm),
            base_celestia_height: *base_celestia_height,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct GenesisInfoError(GenesisInfoErrorKind);

impl GenesisInfoError {
    fn field_not_set(field: &'static str) -> Self {
        Self(GenesisInfoErrorKind::FieldNotSet(field))
    }

    fn incorrect_rollup_id_length(source: IncorrectRollupIdLength) -> Self {
        Self(GenesisInfoErrorKind::IncorrectRollupIdLength(source))
    }
}

#[derive(Debug, thiserror::Error)]
enum GenesisInfoErrorKind {
    #[error("{0} field not set")]
    FieldNotSet(&'static str),
    #[error(".rollup_id field did not contain a valid rollup ID")]
    IncorrectRollupIdLength(#[source] IncorrectRollupIdLength),
}

/// The information the conductor needs to map sequencer and DA heights to
/// rollup block numbers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenesisInfo {
    /// The rollup id which is used to identify the rollup txs.
    rollup_id: RollupId,
    /// The first block height of the sequencer chain to use for rollup
    /// transactions.
    sequencer_genesis_block_height: u32,
    /// The allowed variance in celestia for sequencer blocks to have been
    /// posted.
    celestia_block_variance: u64,
}

impl GenesisInfo {
    #[must_use]
    pub fn rollup_id(&self) -> RollupId {
        self.rollup_id
    }

    #[must_use]
    pub fn sequencer_genesis_block_height(&self) -> u32 {
        self.sequencer_genesis_block_height
    }

    #[must_use]
    pub fn celestia_block_variance(&self) -> u64 {
        self.celestia_block_variance
    }
}

impl Protobuf for GenesisInfo {
    type Error = GenesisInfoError;
    type Raw = raw::GenesisInfo;

    fn try_from_raw_ref(raw: &Self::Raw) -> Result<Self, Self::Error> {
        let Self::Raw {
            rollup_id,
            sequencer_genesis_block_height,
            celestia_block_variance,
        } = raw;
        let Some(rollup_id) = rollup_id else {
            return Err(Self::Error::field_not_set(".rollup_id"));
        };
        let rollup_id = RollupId::try_from_raw(rollup_id)
            .map_err(Self::Error::incorrect_rollup_id_length)?;
        Ok(Self {
            rollup_id,
            sequencer_genesis_block_height: *sequencer_genesis_block_height,
            celestia_block_variance: *celestia_block_variance,
        })
    }

    fn to_raw(&self) -> Self::Raw {
        let Self {
            rollup_id,
            sequencer_genesis_block_height,
            celestia_block_variance,
        } = self;
        Self::Raw {
            rollup_id: Some(rollup_id.to_raw()),
            sequencer_genesis_block_height: *sequencer_genesis_block_height,
            celestia_block_variance: *celestia_block_variance,
        }
    }
}
