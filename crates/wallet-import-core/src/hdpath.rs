//! Base derivation paths per device family.
//!
//! Providers derive the first account (index 0) below the base path.

pub const ETHEREUM_CLASSIC_CHAIN_ID: u64 = 61;

pub fn ledger_hd_path(chain_id: u64) -> String {
    match chain_id {
        ETHEREUM_CLASSIC_CHAIN_ID => "m/44'/60'/160720'/0'".to_owned(),
        _ => "m/44'/60'/0'".to_owned(),
    }
}

pub fn trezor_hd_path(chain_id: u64) -> String {
    match chain_id {
        ETHEREUM_CLASSIC_CHAIN_ID => "m/44'/61'/0'/0".to_owned(),
        _ => "m/44'/60'/0'/0".to_owned(),
    }
}

/// Path of the first account below `base`.
pub fn first_account_path(base: &str) -> String {
    format!("{}/0", base.trim_end_matches('/'))
}
