//! BIP341 script trees, tweaks, and control blocks.
//!
//! All hashing here is pure; lifting the tweaked point onto the curve is the
//! ECC facade's business and happens in the `p2tr` template.

use opbtc_core::hashes::{tagged_hash, TaggedHashWriter};
use opbtc_core::primitives::XOnlyPubKey;
use opbtc_core::ser::write_compact_int;

use thiserror::Error;

use crate::script::Script;

/// The tapscript leaf version.
pub const LEAF_VERSION_TAPSCRIPT: u8 = 0xc0;

/// Maximum number of Merkle path entries in a control block.
pub const CONTROL_MAX_PATH_LEN: usize = 128;

/// Errors raised by taproot tree and control-block handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaprootError {
    /// Leaf versions keep their low bit clear; it is reserved.
    #[error("leaf version 0x{0:02x} uses the reserved low bit")]
    InvalidLeafVersion(u8),

    /// A control block was not `33 + 32m` bytes with `m <= 128`.
    #[error("control block length {0} is not 33 + 32m with m <= 128")]
    InvalidControlBlock(usize),

    /// The internal key inside a control block was out of field range.
    #[error("control block internal key is invalid")]
    InvalidInternalKey,
}

/// A taproot script tree: a single leaf or a pair of subtrees. No balancing
/// is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapTree {
    /// A tapleaf.
    Leaf {
        /// The leaf script.
        script: Script,
        /// The leaf version; low bit clear.
        version: u8,
    },
    /// An interior node.
    Branch(Box<TapTree>, Box<TapTree>),
}

/// A flattened leaf: its hash and the sibling hashes from leaf to root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapLeaf {
    /// The leaf script.
    pub script: Script,
    /// The leaf version.
    pub version: u8,
    /// The leaf's tagged hash.
    pub hash: [u8; 32],
    /// Sibling hashes from the leaf up to the root.
    pub path: Vec<[u8; 32]>,
}

impl TapTree {
    /// A leaf with the tapscript version.
    pub fn leaf(script: Script) -> Self {
        TapTree::Leaf {
            script,
            version: LEAF_VERSION_TAPSCRIPT,
        }
    }

    /// A leaf with an explicit version; the version's low bit is reserved
    /// and must be clear.
    pub fn leaf_with_version(script: Script, version: u8) -> Result<Self, TaprootError> {
        if version & 0xfe != version {
            return Err(TaprootError::InvalidLeafVersion(version));
        }
        Ok(TapTree::Leaf { script, version })
    }

    /// Join two subtrees.
    pub fn branch(left: TapTree, right: TapTree) -> Self {
        TapTree::Branch(Box::new(left), Box::new(right))
    }

    /// The Merkle root of the tree.
    pub fn hash(&self) -> [u8; 32] {
        match self {
            TapTree::Leaf { script, version } => leaf_hash(script.as_ref(), *version),
            TapTree::Branch(left, right) => branch_hash(&left.hash(), &right.hash()),
        }
    }

    /// Every leaf with its Merkle path, leftmost first.
    pub fn leaves(&self) -> Vec<TapLeaf> {
        match self {
            TapTree::Leaf { script, version } => vec![TapLeaf {
                script: script.clone(),
                version: *version,
                hash: leaf_hash(script.as_ref(), *version),
                path: vec![],
            }],
            TapTree::Branch(left, right) => {
                let left_hash = left.hash();
                let right_hash = right.hash();
                let mut leaves = left.leaves();
                for leaf in &mut leaves {
                    leaf.path.push(right_hash);
                }
                let mut from_right = right.leaves();
                for leaf in &mut from_right {
                    leaf.path.push(left_hash);
                }
                leaves.extend(from_right);
                leaves
            }
        }
    }

    /// The leaf matching `script` (and `version`, when given), with its path.
    pub fn find_leaf(&self, script: &Script, version: Option<u8>) -> Option<TapLeaf> {
        self.leaves().into_iter().find(|leaf| {
            leaf.script == *script && version.map(|v| v == leaf.version).unwrap_or(true)
        })
    }
}

/// `taggedHash("TapLeaf", version || compactSize(|script|) || script)`.
pub fn leaf_hash(script: &[u8], version: u8) -> [u8; 32] {
    let mut prefix = Vec::with_capacity(9);
    // Writing to a Vec cannot fail.
    let _ = write_compact_int(&mut prefix, script.len() as u64);

    let mut writer = TaggedHashWriter::new("TapLeaf");
    writer.update(&[version]);
    writer.update(&prefix);
    writer.update(script);
    writer.finish()
}

/// `taggedHash("TapBranch", min(a, b) || max(a, b))`.
pub fn branch_hash(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut writer = TaggedHashWriter::new("TapBranch");
    writer.update(lo);
    writer.update(hi);
    writer.finish()
}

/// `taggedHash("TapTweak", internal || merkle_root?)`.
pub fn tap_tweak(internal: &XOnlyPubKey, merkle_root: Option<&[u8; 32]>) -> [u8; 32] {
    match merkle_root {
        None => tagged_hash("TapTweak", internal.as_ref()),
        Some(root) => {
            let mut writer = TaggedHashWriter::new("TapTweak");
            writer.update(internal.as_ref());
            writer.update(root);
            writer.finish()
        }
    }
}

/// The script-path witness element proving a leaf's tree membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlBlock {
    /// The leaf version; low bit clear.
    pub leaf_version: u8,
    /// Parity of the tweaked output key's y coordinate.
    pub parity: u8,
    /// The untweaked internal key.
    pub internal_pubkey: XOnlyPubKey,
    /// Sibling hashes from the leaf to the root.
    pub path: Vec<[u8; 32]>,
}

impl ControlBlock {
    /// Serialize: `(leaf_version & 0xfe) | parity || internal || path...`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(33 + 32 * self.path.len());
        out.push((self.leaf_version & 0xfe) | (self.parity & 1));
        out.extend_from_slice(self.internal_pubkey.as_ref());
        for entry in &self.path {
            out.extend_from_slice(entry);
        }
        out
    }

    /// Parse a control block.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TaprootError> {
        if bytes.len() < 33
            || (bytes.len() - 33) % 32 != 0
            || (bytes.len() - 33) / 32 > CONTROL_MAX_PATH_LEN
        {
            return Err(TaprootError::InvalidControlBlock(bytes.len()));
        }
        let internal_pubkey = XOnlyPubKey::try_from(&bytes[1..33])
            .map_err(|_| TaprootError::InvalidInternalKey)?;
        let path = bytes[33..]
            .chunks_exact(32)
            .map(|chunk| {
                let mut entry = [0u8; 32];
                entry.copy_from_slice(chunk);
                entry
            })
            .collect();
        Ok(ControlBlock {
            leaf_version: bytes[0] & 0xfe,
            parity: bytes[0] & 1,
            internal_pubkey,
            path,
        })
    }

    /// Fold the path over a leaf hash to recover the Merkle root.
    pub fn merkle_root(&self, leaf: &[u8; 32]) -> [u8; 32] {
        self.path
            .iter()
            .fold(*leaf, |acc, sibling| branch_hash(&acc, sibling))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::script::{compile, opcodes::OP_CHECKSIG, StackItem};

    fn checksig_leaf(key_byte: u8) -> Script {
        compile(&[
            StackItem::Push(vec![key_byte; 32]),
            StackItem::Op(OP_CHECKSIG),
        ])
    }

    #[test]
    fn leaf_version_reserves_the_low_bit() {
        assert!(TapTree::leaf_with_version(Script::null(), 0xc0).is_ok());
        assert_eq!(
            TapTree::leaf_with_version(Script::null(), 0xc1),
            Err(TaprootError::InvalidLeafVersion(0xc1))
        );
    }

    #[test]
    fn branch_hash_sorts_its_children() {
        let a = [0x01u8; 32];
        let b = [0x02u8; 32];
        assert_eq!(branch_hash(&a, &b), branch_hash(&b, &a));
    }

    #[test]
    fn single_leaf_root_is_the_leaf_hash() {
        let script = checksig_leaf(0x11);
        let tree = TapTree::leaf(script.clone());
        assert_eq!(tree.hash(), leaf_hash(script.as_ref(), 0xc0));
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 1);
        assert!(leaves[0].path.is_empty());
    }

    #[test]
    fn paths_recover_the_root() {
        let tree = TapTree::branch(
            TapTree::branch(
                TapTree::leaf(checksig_leaf(0x11)),
                TapTree::leaf(checksig_leaf(0x22)),
            ),
            TapTree::leaf(checksig_leaf(0x33)),
        );
        let root = tree.hash();
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[0].path.len(), 2);
        assert_eq!(leaves[2].path.len(), 1);
        for leaf in leaves {
            let folded = leaf
                .path
                .iter()
                .fold(leaf.hash, |acc, sibling| branch_hash(&acc, sibling));
            assert_eq!(folded, root);
        }
    }

    #[test]
    fn control_blocks_round_trip() {
        let internal =
            XOnlyPubKey::try_from(
                hex::decode("d6889cb081036e0faefa3a35157ad71086b123b2b144b649798b494c300a961d")
                    .unwrap()
                    .as_slice(),
            )
            .unwrap();
        let block = ControlBlock {
            leaf_version: 0xc0,
            parity: 1,
            internal_pubkey: internal,
            path: vec![[0x44; 32], [0x55; 32]],
        };
        let bytes = block.to_bytes();
        assert_eq!(bytes.len(), 33 + 64);
        assert_eq!(bytes[0], 0xc1);
        assert_eq!(ControlBlock::from_bytes(&bytes).unwrap(), block);

        assert_eq!(
            ControlBlock::from_bytes(&bytes[..40]),
            Err(TaprootError::InvalidControlBlock(40))
        );
    }
}
