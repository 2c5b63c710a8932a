//! Macros for deriving serde and byte-wrapper boilerplate.

#[macro_export]
/// Implement `serde::Serialize` and `serde::Deserialize` by passing through to the hex
/// representation of the raw bytes.
macro_rules! impl_hex_serde {
    ($item:ty) => {
        impl serde::Serialize for $item {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&hex::encode(std::convert::AsRef::<[u8]>::as_ref(self)))
            }
        }

        impl<'de> serde::Deserialize<'de> for $item {
            fn deserialize<D>(deserializer: D) -> Result<$item, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s: &str = serde::Deserialize::deserialize(deserializer)?;
                let v = hex::decode(s).map_err(|e| serde::de::Error::custom(e.to_string()))?;
                std::convert::TryFrom::try_from(v.as_slice())
                    .map_err(|e| serde::de::Error::custom(format!("{:?}", e)))
            }
        }
    };
}

#[macro_export]
/// Wrap a fixed-length byte array in a newtype with length-checked constructors.
macro_rules! wrap_fixed_bytes {
    (
        $(#[$outer:meta])*
        $wrapper_name:ident, $len:expr
    ) => {
        $(#[$outer])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $wrapper_name([u8; $len]);

        impl $wrapper_name {
            /// The byte length of this sort.
            pub const LEN: usize = $len;

            /// Wrap an owned array.
            pub fn new(buf: [u8; $len]) -> Self {
                Self(buf)
            }

            /// Borrow the underlying array.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Copy out the underlying array.
            pub fn to_array(self) -> [u8; $len] {
                self.0
            }
        }

        impl std::convert::AsRef<[u8]> for $wrapper_name {
            fn as_ref(&self) -> &[u8] {
                &self.0[..]
            }
        }

        impl From<[u8; $len]> for $wrapper_name {
            fn from(buf: [u8; $len]) -> Self {
                Self(buf)
            }
        }

        impl std::convert::TryFrom<&[u8]> for $wrapper_name {
            type Error = $crate::primitives::PrimitiveError;

            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                if slice.len() != $len {
                    return Err($crate::primitives::PrimitiveError::InvalidLength {
                        expected: $len,
                        got: slice.len(),
                    });
                }
                let mut buf = [0u8; $len];
                buf.copy_from_slice(slice);
                Ok(Self(buf))
            }
        }

        impl std::fmt::Debug for $wrapper_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($wrapper_name), hex::encode(self.0))
            }
        }

        impl std::fmt::Display for $wrapper_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        $crate::impl_hex_serde!($wrapper_name);
    };
}

#[macro_export]
/// Wrap a prefixed vector of bytes (`u8`) in a newtype, and implement convenience functions
/// for it. The wrapped type serializes as a CompactSize-prefixed slice.
macro_rules! wrap_prefixed_byte_vector {
    (
        $(#[$outer:meta])*
        $wrapper_name:ident
    ) => {
        $(#[$outer])*
        #[derive(Clone, Debug, Eq, PartialEq, Default, Hash, PartialOrd, Ord)]
        pub struct $wrapper_name(Vec<u8>);

        impl $crate::ser::ByteFormat for $wrapper_name {
            type Error = $crate::ser::SerError;

            fn serialized_length(&self) -> usize {
                self.len() + $crate::ser::var_int_size(self.len() as u64)
            }

            fn read_from<R>(reader: &mut R) -> Result<Self, Self::Error>
            where
                R: std::io::Read,
            {
                Ok(Self($crate::ser::read_var_slice(reader)?))
            }

            fn write_to<W>(&self, writer: &mut W) -> Result<usize, Self::Error>
            where
                W: std::io::Write,
            {
                $crate::ser::write_var_slice(writer, &self.0)
            }
        }

        impl $wrapper_name {
            /// Instantiate a new wrapped vector.
            pub fn new(v: Vec<u8>) -> Self {
                Self(v)
            }

            /// Construct an empty wrapped vector instance.
            pub fn null() -> Self {
                Self(vec![])
            }

            /// Return a reference to the underlying bytes.
            pub fn items(&self) -> &[u8] {
                &self.0
            }

            /// Consume self, returning the underlying bytes.
            pub fn into_bytes(self) -> Vec<u8> {
                self.0
            }

            /// Return the length of the item vector.
            pub fn len(&self) -> usize {
                self.0.len()
            }

            /// Return true if the length of the item vector is 0.
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }
        }

        impl std::convert::AsRef<[u8]> for $wrapper_name {
            fn as_ref(&self) -> &[u8] {
                &self.0[..]
            }
        }

        impl From<&[u8]> for $wrapper_name {
            fn from(v: &[u8]) -> Self {
                Self(v.to_vec())
            }
        }

        impl From<Vec<u8>> for $wrapper_name {
            fn from(v: Vec<u8>) -> Self {
                Self(v)
            }
        }

        impl std::ops::Index<usize> for $wrapper_name {
            type Output = u8;

            fn index(&self, index: usize) -> &Self::Output {
                &self.0[index]
            }
        }

        $crate::impl_hex_serde!($wrapper_name);
    };
}
