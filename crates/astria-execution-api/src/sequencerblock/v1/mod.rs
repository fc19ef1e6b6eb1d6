use bytes::Bytes;

use crate::{
    generated::astria::sequencerblock::v1 as raw,
    primitive::v1::{
        IncorrectRollupIdLength,
        RollupId,
        TransactionId,
    },
};

/// A deposit of funds into the rollup, emitted by the sequencer whenever a
/// bridge lock is executed against one of the rollup's bridge accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    /// The bech32m encoded bridge account on the sequencer to which the funds
    /// were sent.
    pub bridge_address: String,
    /// The rollup ID registered to `bridge_address`.
    pub rollup_id: RollupId,
    /// The amount that was transferred to `bridge_address`.
    pub amount: u128,
    /// The denomination of the asset that was transferred.
    pub asset: String,
    /// The address on the rollup which to credit with the bridged funds.
    pub destination_chain_address: String,
    /// The ID of the sequencer transaction that contained the deposit action.
    pub source_transaction_id: TransactionId,
    /// The index of the deposit action within its transaction.
    pub source_action_index: u64,
}

impl Deposit {
    #[must_use]
    pub fn into_raw(self) -> raw::Deposit {
        let Self {
            bridge_address,
            rollup_id,
            amount,
            asset,
            destination_chain_address,
            source_transaction_id,
            source_action_index,
        } = self;
        raw::Deposit {
            bridge_address: Some(crate::generated::astria::primitive::v1::Address {
                bech32m: bridge_address,
            }),
            rollup_id: Some(rollup_id.into_raw()),
            amount: Some(amount.into()),
            asset,
            destination_chain_address,
            source_transaction_id: Some(source_transaction_id.to_raw()),
            source_action_index,
        }
    }

    /// Attempts to transform the deposit from its raw representation.
    ///
    /// # Errors
    ///
    /// - if the bridge address is unset
    /// - if the amount is unset
    /// - if the rollup ID is unset or invalid
    /// - if the source transaction ID is unset
    pub fn try_from_raw(raw: raw::Deposit) -> Result<Self, DepositError> {
        let raw::Deposit {
            bridge_address,
            rollup_id,
            amount,
            asset,
            destination_chain_address,
            source_transaction_id,
            source_action_index,
        } = raw;
        let Some(bridge_address) = bridge_address else {
            return Err(DepositError::field_not_set("bridge_address"));
        };
        let amount = amount.ok_or(DepositError::field_not_set("amount"))?.into();
        let Some(rollup_id) = rollup_id else {
            return Err(DepositError::field_not_set("rollup_id"));
        };
        let rollup_id =
            RollupId::try_from_raw(&rollup_id).map_err(DepositError::incorrect_rollup_id_length)?;
        let Some(source_transaction_id) = source_transaction_id else {
            return Err(DepositError::field_not_set("source_transaction_id"));
        };
        let source_transaction_id = TransactionId::from_raw(&source_transaction_id);
        Ok(Self {
            bridge_address: bridge_address.bech32m,
            rollup_id,
            amount,
            asset,
            destination_chain_address,
            source_transaction_id,
            source_action_index,
        })
    }
}

impl From<Deposit> for raw::Deposit {
    fn from(deposit: Deposit) -> Self {
        deposit.into_raw()
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct DepositError(DepositErrorKind);

impl DepositError {
    fn field_not_set(field: &'static str) -> Self {
        Self(DepositErrorKind::FieldNotSet(field))
    }

    fn incorrect_rollup_id_length(source: IncorrectRollupIdLength) -> Self {
        Self(DepositErrorKind::IncorrectRollupIdLength(source))
    }
}

#[derive(Debug, thiserror::Error)]
enum DepositErrorKind {
    #[error("the expected field in the raw source type was not set: `{0}`")]
    FieldNotSet(&'static str),
    #[error("the rollup ID length is not 32 bytes")]
    IncorrectRollupIdLength(#[source] IncorrectRollupIdLength),
}

/// One item in the rollup's slot of a sequencer block.
///
/// The data can be either opaque bytes of a transaction submitted by a user of
/// the rollup, or a [`Deposit`] emitted by the sequencer's bridge machinery.
#[derive(Debug, Clone, PartialEq)]
pub enum RollupData {
    SequencedData(Bytes),
    Deposit(Box<Deposit>),
}

impl RollupData {
    #[must_use]
    pub fn into_raw(self) -> raw::RollupData {
        match self {
            Self::SequencedData(data) => raw::RollupData {
                value: Some(raw::rollup_data::Value::SequencedData(data)),
            },
            Self::Deposit(deposit) => raw::RollupData {
                value: Some(raw::rollup_data::Value::Deposit(deposit.into_raw())),
            },
        }
    }

    /// Attempts to transform the `RollupData` from its raw representation.
    ///
    /// # Errors
    ///
    /// - if the `value` field is not set
    /// - if the variant is `Deposit` but the contained deposit is invalid
    pub fn try_from_raw(raw: raw::RollupData) -> Result<Self, RollupDataError> {
        match raw.value {
            Some(raw::rollup_data::Value::SequencedData(data)) => Ok(Self::SequencedData(data)),
            Some(raw::rollup_data::Value::Deposit(deposit)) => Deposit::try_from_raw(deposit)
                .map(Box::new)
                .map(Self::Deposit)
                .map_err(RollupDataError::deposit),
            None => Err(RollupDataError::field_not_set("value")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct RollupDataError(RollupDataErrorKind);

impl RollupDataError {
    fn field_not_set(field: &'static str) -> Self {
        Self(RollupDataErrorKind::FieldNotSet(field))
    }

    fn deposit(source: DepositError) -> Self {
        Self(RollupDataErrorKind::Deposit(source))
    }
}

#[derive(Debug, thiserror::Error)]
enum RollupDataErrorKind {
    #[error("the expected field in the raw source type was not set: `{0}`")]
    FieldNotSet(&'static str),
    #[error("the `deposit` field was invalid")]
    Deposit(#[source] DepositError),
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{
        Deposit,
        RollupData,
    };
    use crate::{
        generated::astria::sequencerblock::v1 as raw,
        primitive::v1::{
            RollupId,
            TransactionId,
        },
    };

    fn deposit() -> Deposit {
        Deposit {
            bridge_address: "astria1hwamhwamhwamhwamhwamhwamhwamhwamnvj02m".to_string(),
            rollup_id: RollupId::from_unhashed_bytes("test"),
            amount: 1_000_000_000_000_000_000,
            asset: "nria".to_string(),
            destination_chain_address: "0xfffffffffffffffffffffffffffffffffffffffe".to_string(),
            source_transaction_id: TransactionId::new("test_tx_hash".to_string()),
            source_action_index: 3,
        }
    }

    #[test]
    fn deposit_roundtrips_through_raw() {
        let expected = deposit();
        let actual = Deposit::try_from_raw(expected.clone().into_raw()).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn unset_deposit_fields_are_caught() {
        let mut raw = deposit().into_raw();
        raw.amount = None;
        Deposit::try_from_raw(raw).expect_err("a deposit without an amount must be rejected");

        let mut raw = deposit().into_raw();
        raw.rollup_id = None;
        Deposit::try_from_raw(raw).expect_err("a deposit without a rollup ID must be rejected");
    }

    #[test]
    fn unset_rollup_data_value_is_caught() {
        RollupData::try_from_raw(raw::RollupData {
            value: None,
        })
        .expect_err("rollup data without a value must be rejected");
    }

    #[test]
    fn sequenced_data_roundtrips_through_raw() {
        let expected = RollupData::SequencedData(Bytes::from_static(b"sequenced"));
        let actual = RollupData::try_from_raw(expected.clone().into_raw()).unwrap();
        assert_eq!(expected, actual);
    }
}
