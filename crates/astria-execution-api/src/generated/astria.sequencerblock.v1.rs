/// A deposit into the rollup, constructed on the sequencer whenever a bridge
/// lock action is executed against a bridge account registered for the rollup.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Deposit {
    /// The bridge account the funds were locked into on the sequencer.
    #[prost(message, optional, tag = "1")]
    pub bridge_address: ::core::option::Option<super::super::primitive::v1::Address>,
    /// The rollup registered to `bridge_address`.
    #[prost(message, optional, tag = "2")]
    pub rollup_id: ::core::option::Option<super::super::primitive::v1::RollupId>,
    /// The amount that was locked.
    #[prost(message, optional, tag = "3")]
    pub amount: ::core::option::Option<super::super::primitive::v1::Uint128>,
    /// The denomination of the asset that was locked.
    #[prost(string, tag = "4")]
    pub asset: ::prost::alloc::string::String,
    /// The account on the rollup which is to be credited with the deposited
    /// funds, in the rollup's native address encoding.
    #[prost(string, tag = "5")]
    pub destination_chain_address: ::prost::alloc::string::String,
    /// The identifier of the sequencer transaction whose action caused this
    /// deposit.
    #[prost(message, optional, tag = "6")]
    pub source_transaction_id: ::core::option::Option<
        super::super::primitive::v1::TransactionId,
    >,
    /// The index of the deposit-causing action within its transaction.
    #[prost(uint64, tag = "7")]
    pub source_action_index: u64,
}
impl ::prost::Name for Deposit {
    const NAME: &'static str = "Deposit";
    const PACKAGE: &'static str = "astria.sequencerblock.v1";
    fn full_name() -> ::prost::alloc::string::String {
        ::prost::alloc::format!("astria.sequencerblock.v1.{}", Self::NAME)
    }
}
/// A piece of data within the rollup's slot of a sequencer block.
///
/// Either an opaque transaction submitted to the sequencer by a user of the
/// rollup, or a deposit emitted by the sequencer's bridge machinery.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollupData {
    #[prost(oneof = "rollup_data::Value", tags = "1, 2")]
    pub value: ::core::option::Option<rollup_data::Value>,
}
/// Nested message and enum types in `RollupData`.
pub mod rollup_data {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(bytes = "bytes", tag = "1")]
        SequencedData(::prost::bytes::Bytes),
        #[prost(message, tag = "2")]
        Deposit(super::Deposit),
    }
}
impl ::prost::Name for RollupData {
    const NAME: &'static str = "RollupData";
    const PACKAGE: &'static str = "astria.sequencerblock.v1";
    fn full_name() -> ::prost::alloc::string::String {
        ::prost::alloc::format!("astria.sequencerblock.v1.{}", Self::NAME)
    }
}
