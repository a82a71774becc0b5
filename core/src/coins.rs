// Copyright (c) 2023 The hwcoin Developers

//! Supported coin parameters

use heapless::String;

use hwcoin_proto::CoinType;

/// Static coin parameters
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CoinInfo {
    pub name: &'static str,
    pub shortcut: &'static str,
    /// P2PKH address prefix
    pub address_type: u32,
    /// P2SH address prefix
    pub address_type_p2sh: u32,
    /// Fee per kilobyte above which the user is warned
    pub maxfee_kb: u64,
    pub signed_message_header: &'static str,
    pub xpub_magic: u32,
    pub segwit: bool,
    /// Display decimals
    pub decimals: u32,
}

pub const BITCOIN: CoinInfo = CoinInfo {
    name: "Bitcoin",
    shortcut: "BTC",
    address_type: 0,
    address_type_p2sh: 5,
    maxfee_kb: 100_000,
    signed_message_header: "\x18Bitcoin Signed Message:\n",
    xpub_magic: 0x0488_b21e,
    segwit: true,
    decimals: 8,
};

pub const TESTNET: CoinInfo = CoinInfo {
    name: "Testnet",
    shortcut: "TEST",
    address_type: 111,
    address_type_p2sh: 196,
    maxfee_kb: 10_000_000,
    signed_message_header: "\x18Bitcoin Signed Message:\n",
    xpub_magic: 0x0435_87cf,
    segwit: true,
    decimals: 8,
};

pub const LITECOIN: CoinInfo = CoinInfo {
    name: "Litecoin",
    shortcut: "LTC",
    address_type: 48,
    address_type_p2sh: 50,
    maxfee_kb: 1_000_000,
    signed_message_header: "\x19Litecoin Signed Message:\n",
    xpub_magic: 0x019d_a462,
    segwit: true,
    decimals: 8,
};

/// Supported coins, the first entry is the default
pub const COINS: &[CoinInfo] = &[BITCOIN, TESTNET, LITECOIN];

/// Default coin name where requests omit one
pub const DEFAULT_COIN: &str = "Bitcoin";

/// Lookup a coin by name
pub fn coin_by_name(name: &str) -> Option<&'static CoinInfo> {
    COINS.iter().find(|c| c.name == name)
}

impl CoinInfo {
    /// Wire representation, as advertised in features
    pub fn to_coin_type(&self) -> CoinType {
        CoinType {
            coin_name: String::try_from(self.name).ok(),
            coin_shortcut: String::try_from(self.shortcut).ok(),
            address_type: Some(self.address_type),
            maxfee_kb: Some(self.maxfee_kb),
            address_type_p2sh: Some(self.address_type_p2sh),
            signed_message_header: String::try_from(self.signed_message_header).ok(),
            xpub_magic: Some(self.xpub_magic),
            xprv_magic: None,
            segwit: Some(self.segwit),
        }
    }

    /// Amount scalar for display (10^decimals)
    pub const fn scalar(&self) -> i64 {
        10i64.pow(self.decimals)
    }
}
