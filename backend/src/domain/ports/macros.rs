//! Helper macro generating port error enums with snake_case constructors.
//!
//! Each variant becomes a `thiserror` variant with the given message and a
//! constructor named after the variant. Struct-variant fields accept
//! `impl Into<T>` so callers can pass `&str` for `String` fields.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            #[doc = concat!("Construct [`Self::", stringify!($variant), "`].")]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            #[doc = concat!("Construct [`Self::", stringify!($variant), "`].")]
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    define_port_error! {
        pub enum MailboxError {
            Unreachable { host: String } => "mailbox host {host} unreachable",
            Throttled { retry_after_secs: u32 } => "retry after {retry_after_secs}s",
            Rejected { address: String, status: u16 } => "{address} rejected with {status}",
            Closed => "mailbox closed",
        }
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = MailboxError::unreachable("smtp.example.com");
        assert_eq!(err.to_string(), "mailbox host smtp.example.com unreachable");
    }

    #[test]
    fn constructors_preserve_non_string_types() {
        let err = MailboxError::throttled(30_u32);
        assert_eq!(err.to_string(), "retry after 30s");
    }

    #[test]
    fn constructors_support_mixed_and_unit_variants() {
        assert_eq!(
            MailboxError::rejected("ada@example.com", 550_u16).to_string(),
            "ada@example.com rejected with 550"
        );
        assert_eq!(MailboxError::closed(), MailboxError::Closed);
    }
}
