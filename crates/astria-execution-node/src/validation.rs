//! Static request validation helpers.

use astria_execution_api::generated::astria::execution::v1 as raw;
use bech32::primitives::decode::CheckedHrpstring;
use eyre::{
    ensure,
    eyre,
    OptionExt as _,
};

use crate::chain::ADDRESS_LEN;

/// Checks the parts of an `ExecuteBlockRequest` which can be validated
/// without consulting chain state.
pub(crate) fn validate_static_execute_block_request(
    request: &raw::ExecuteBlockRequest,
) -> eyre::Result<()> {
    ensure!(
        request.prev_block_hash.len() == 32,
        "prev_block_hash must be 32 bytes, got {}",
        request.prev_block_hash.len(),
    );
    let timestamp = request
        .timestamp
        .as_ref()
        .ok_or_eyre("timestamp is not set")?;
    ensure!(
        timestamp.seconds > 0,
        "timestamp seconds must be positive, got {}",
        timestamp.seconds,
    );
    Ok(())
}

/// Checks that `input` is a valid bech32m string with the human readable
/// prefix `prefix` and a 20 byte payload.
pub(crate) fn validate_bech32m_address(input: &str, prefix: &str) -> eyre::Result<()> {
    let checked = CheckedHrpstring::new::<bech32::Bech32m>(input)
        .map_err(|source| eyre!("failed decoding as bech32m: {source}"))?;
    let expected =
        bech32::Hrp::parse(prefix).map_err(|source| eyre!("invalid address prefix: {source}"))?;
    ensure!(
        checked.hrp() == expected,
        "address has prefix `{}` but `{prefix}` is required",
        checked.hrp(),
    );
    let len = checked.byte_iter().count();
    ensure!(
        len == ADDRESS_LEN,
        "address must decode to {ADDRESS_LEN} bytes, got {len}",
    );
    Ok(())
}
