//! Network parameter records.
//!
//! Unlike version bytes baked into the type system, templates here dispatch
//! on a runtime [`Network`] value carried inside each payment, so the
//! records are plain consts. The OPNet variants are the Bitcoin parameter
//! sets with the second Bech32m human-readable prefix populated; witness
//! version 16 outputs encode under that prefix.

/// BIP32 extended-key version prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bip32Prefixes {
    /// Version bytes for extended public keys (`xpub`, `tpub`).
    pub public: u32,
    /// Version bytes for extended private keys (`xprv`, `tprv`).
    pub private: u32,
}

/// Encoding parameters for a Bitcoin-like network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    /// Prefix for signed messages.
    pub message_prefix: &'static str,
    /// Bech32/Bech32m human-readable prefix for witness addresses.
    pub bech32: &'static str,
    /// Optional second Bech32m prefix reserved for witness-v16 (OPNet)
    /// outputs.
    pub bech32_opnet: Option<&'static str>,
    /// BIP32 extended-key versions.
    pub bip32: Bip32Prefixes,
    /// Base58Check version byte for P2PKH addresses.
    pub pub_key_hash: u8,
    /// Base58Check version byte for P2SH addresses.
    pub script_hash: u8,
    /// WIF private-key version byte.
    pub wif: u8,
}

/// Bitcoin mainnet.
pub const BITCOIN: Network = Network {
    message_prefix: "\x18Bitcoin Signed Message:\n",
    bech32: "bc",
    bech32_opnet: None,
    bip32: Bip32Prefixes {
        public: 0x0488_b21e,
        private: 0x0488_ade4,
    },
    pub_key_hash: 0x00,
    script_hash: 0x05,
    wif: 0x80,
};

/// Bitcoin testnet.
pub const TESTNET: Network = Network {
    message_prefix: "\x18Bitcoin Signed Message:\n",
    bech32: "tb",
    bech32_opnet: None,
    bip32: Bip32Prefixes {
        public: 0x0435_87cf,
        private: 0x0435_8394,
    },
    pub_key_hash: 0x6f,
    script_hash: 0xc4,
    wif: 0xef,
};

/// Bitcoin signet. Shares testnet version bytes.
pub const SIGNET: Network = Network {
    bech32: "tb",
    ..TESTNET
};

/// Bitcoin regtest.
pub const REGTEST: Network = Network {
    message_prefix: "\x18Bitcoin Signed Message:\n",
    bech32: "bcrt",
    bech32_opnet: None,
    bip32: Bip32Prefixes {
        public: 0x0435_87cf,
        private: 0x0435_8394,
    },
    pub_key_hash: 0x6f,
    script_hash: 0xc4,
    wif: 0xef,
};

/// OPNet over Bitcoin mainnet.
pub const OPNET: Network = Network {
    bech32_opnet: Some("op"),
    ..BITCOIN
};

/// OPNet over Bitcoin testnet.
pub const OPNET_TESTNET: Network = Network {
    bech32_opnet: Some("top"),
    ..TESTNET
};

/// OPNet over Bitcoin regtest.
pub const OPNET_REGTEST: Network = Network {
    bech32_opnet: Some("rop"),
    ..REGTEST
};

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn networks_discriminate_versions() {
        assert_ne!(BITCOIN.pub_key_hash, TESTNET.pub_key_hash);
        assert_ne!(BITCOIN.script_hash, TESTNET.script_hash);
        assert_eq!(SIGNET.pub_key_hash, TESTNET.pub_key_hash);
        assert_eq!(OPNET.pub_key_hash, BITCOIN.pub_key_hash);
        assert_eq!(OPNET.bech32, "bc");
        assert_eq!(OPNET.bech32_opnet, Some("op"));
        assert_eq!(BITCOIN.bech32_opnet, None);
    }
}
