/// A 128 bit unsigned integer encoded in protobuf.,
///
/// Protobuf does not support integers larger than 64 bits,
/// so this message encodes a u128 by splitting it into its
/// upper 64 and lower 64 bits, each encoded as a uint64.
///
/// A native u128 x can then be constructed by casting both
/// integers to u128, left shifting hi by 64 positions and
/// adding lo:
///
/// x = (hi as u128) << 64 + (lo as u128)
#[derive(Copy)]
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Uint128 {
    #[prost(uint64, tag = "1")]
    pub lo: u64,
    #[prost(uint64, tag = "2")]
    pub hi: u64,
}
impl ::prost::Name for Uint128 {
    const NAME: &'static str = "Uint128";
    const PACKAGE: &'static str = "astria.primitive.v1";
    fn full_name() -> ::prost::alloc::string::String {
        ::prost::alloc::format!("astria.primitive.v1.{}", Self::NAME)
    }
}
/// A `RollupId` is a unique identifier for a rollup chain.
/// It must be 32 bytes long. It can be derived from a string
/// using a sha256 hash.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollupId {
    #[prost(bytes = "bytes", tag = "1")]
    pub inner: ::prost::bytes::Bytes,
}
impl ::prost::Name for RollupId {
    const NAME: &'static str = "RollupId";
    const PACKAGE: &'static str = "astria.primitive.v1";
    fn full_name() -> ::prost::alloc::string::String {
        ::prost::alloc::format!("astria.primitive.v1.{}", Self::NAME)
    }
}
/// An address on the sequencer, encoded as bech32m.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Address {
    /// A bech32m encoded string. The data are the first 20 bytes of a
    /// sha256-hashed ed25519 public key.
    #[prost(string, tag = "1")]
    pub bech32m: ::prost::alloc::string::String,
}
impl ::prost::Name for Address {
    const NAME: &'static str = "Address";
    const PACKAGE: &'static str = "astria.primitive.v1";
    fn full_name() -> ::prost::alloc::string::String {
        ::prost::alloc::format!("astria.primitive.v1.{}", Self::NAME)
    }
}
/// A `TransactionId` carries the identifier of a sequencer transaction,
/// the hex encoded sha256 hash of its raw bytes.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionId {
    #[prost(string, tag = "1")]
    pub inner: ::prost::alloc::string::String,
}
impl ::prost::Name for TransactionId {
    const NAME: &'static str = "TransactionId";
    const PACKAGE: &'static str = "astria.primitive.v1";
    fn full_name() -> ::prost::alloc::string::String {
        ::prost::alloc::format!("astria.primitive.v1.{}", Self::NAME)
    }
}
