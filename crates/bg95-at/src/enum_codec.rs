//! Bidirectional lookup between small integer codes and display strings.
//!
//! Command parsers use these tables to turn numeric fields into readable
//! descriptions and back. A miss is reported as [`UNKNOWN`] or `None`, never
//! as an error.

/// Description returned for a code missing from its table.
pub const UNKNOWN: &str = "UNKNOWN";

/// One code/description pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumEntry {
    /// Numeric code as it appears on the wire.
    pub code: i32,
    /// Display string.
    pub name: &'static str,
}

/// Look up the description for a code.
pub fn enum_to_str(code: i32, table: &[EnumEntry]) -> &'static str {
    table
        .iter()
        .find(|entry| entry.code == code)
        .map_or(UNKNOWN, |entry| entry.name)
}

/// Look up the code for a description.
pub fn str_to_enum(name: &str, table: &[EnumEntry]) -> Option<i32> {
    table
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| entry.code)
}

// ============================================================================
// Code enums: single-source definition via macro
// ============================================================================

/// Define a `Copy` enum whose variants map to wire codes and descriptions.
///
/// The generated type gets a `TABLE` of [`EnumEntry`] values plus
/// `from_code`, `code`, `description`, `from_description` and a `Display`
/// impl that prints the description.
///
/// ```
/// bg95_at::code_enum! {
///     /// Access technology.
///     pub enum Act {
///         Gsm = 0 => "GSM",
///         Emtc = 8 => "eMTC",
///     }
/// }
///
/// assert_eq!(Act::from_code(8), Some(Act::Emtc));
/// assert_eq!(Act::Gsm.to_string(), "GSM");
/// ```
#[macro_export]
macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:expr => $desc:expr ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )*
        }

        impl $name {
            /// Code/description table.
            pub const TABLE: &'static [$crate::EnumEntry] = &[
                $( $crate::EnumEntry { code: $code, name: $desc }, )*
            ];

            /// Decode from a wire code. Returns `None` for unknown codes.
            pub fn from_code(code: i32) -> Option<Self> {
                $( if code == $code { return Some($name::$variant); } )*
                None
            }

            /// Encode to the wire code.
            pub fn code(self) -> i32 {
                match self {
                    $( $name::$variant => $code, )*
                }
            }

            /// Human-readable description.
            pub fn description(self) -> &'static str {
                $crate::enum_to_str(self.code(), Self::TABLE)
            }

            /// Decode from a description.
            pub fn from_description(name: &str) -> Option<Self> {
                $crate::str_to_enum(name, Self::TABLE).and_then(Self::from_code)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.description())
            }
        }
    };
}
