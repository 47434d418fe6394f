//!
//! # Enum-String Mapping Module
//!
//! Defines the [enumstr] macro and paired [EnumStr] trait,
//! mapping each variant of a fieldless enum to a static string value.
//! Line-oriented formats such as extracted-netlist files expose their record
//! keys and device classes as one of a fixed set of strings;
//! [enumstr] keeps each such set and its spellings in one place.
//!
//! The [EnumStr] trait defines two central methods:
//! * `to_str(&self) -> &'static str` converts the enum to its string value.
//! * `from_str(&str) -> Option<Self>` does the opposite, returning an [Option] indicator of success or failure.
//!
//! Example:
//!
//! ```rs
//! use ext21utils::enumstr;
//!
//! enumstr!(
//! /// # Pump States
//! PumpState {
//!     Filling: "FILL",
//!     Draining: "DRAIN",
//! }
//! );
//! ```
//!

///
/// # String-Enumeration Trait
///
/// Defines two central methods:
/// * `to_str(&self) -> &'static str` converts the enum to its string value.
/// * `from_str(&str) -> Option<Self>` does the opposite, returning an [Option] indicator of success or failure.
///
/// While [EnumStr] can be implemented by any type, its primary intent is
/// implementation by the [enumstr] macro.
///
pub trait EnumStr: std::marker::Sized {
    fn to_str(&self) -> &'static str;
    fn from_str(txt: &str) -> Option<Self>;
}

///
/// # Enum-String Pairing Macro
///
/// Creates an `enum` which:
/// * (a) Has paired string-values, as commonly arrive in text-format fields.
/// * (b) Automatically implements the [EnumStr] trait for conversions to and from those strings.
/// * (c) Automatically implements [std::fmt::Display], writing the string-values.
///
/// All variants are fieldless, with derived implementations of common traits,
/// notably including `serde::{Serialize, Deserialize}` -
/// which must be in scope at each expansion site.
///
#[macro_export]
macro_rules! enumstr {
    (   $(#[$meta: meta])*
        $enum_name: ident {
        $( $variant: ident : $strval: literal ),* $(,)?
    }) => {
        $(#[$meta])*
        #[allow(dead_code)]
        #[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
        pub enum $enum_name {
            $( #[doc=$strval]
                $variant ),*
        }
        impl EnumStr for $enum_name {
            /// Convert a [$enum_name] variant to its paired (static) string value.
            #[allow(dead_code)]
            fn to_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $strval),*,
                }
            }
            /// Create a [$enum_name] from one of its string-values.
            /// Returns `None` if input `txt` does not match one of [$enum_name]'s variants.
            /// Note `from_str` is case *sensitive*, i.e. uses a native string comparison.
            fn from_str(txt: &str) -> Option<Self> {
                match txt {
                    $( $strval => Some(Self::$variant)),*,
                    _ => None,
                }
            }
        }
        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                let s = match self {
                    $( Self::$variant => $strval),*,
                };
                write!(f, "{}", s)
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[test]
    fn test_enumstr() {
        enumstr!(
            /// # Device Classes, as spelled in netlist records
            DeviceClass {
                Mosfet: "mosfet",
                Resistor: "res",
            }
        );

        // Test conversion to string
        assert_eq!(DeviceClass::Mosfet.to_str(), "mosfet");
        assert_eq!(DeviceClass::Resistor.to_str(), "res");

        // Test conversion from string
        assert_eq!(DeviceClass::from_str("mosfet"), Some(DeviceClass::Mosfet));
        assert_eq!(DeviceClass::from_str("res"), Some(DeviceClass::Resistor));
        assert_eq!(DeviceClass::from_str("diode"), None);

        // And test [Display]
        assert_eq!(format!("{}", DeviceClass::Mosfet), "mosfet");
    }
}
