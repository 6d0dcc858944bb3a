//! Macros for defining kind enums.

/// Macro for defining a kind enum stored as a small integer.
///
/// # Example
///
/// ```rust
/// # use common::define_kind;
///
/// define_kind! {
///     #[doc = "Paint finish."]
///     enum Finish {
///         #[doc = "Glossy paint."]
///         Gloss = 1,
///
///         #[doc = "Matte paint."]
///         Matte = 2,
///     }
/// }
///
/// assert_eq!(Finish::from_u8(2), Some(Finish::Matte));
/// assert_eq!(Finish::Gloss.to_string(), "GLOSS");
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            Eq,
            Hash,
            PartialEq,
        )]
        #[doc = $doc]
        #[repr(u8)]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $(
                 #[doc = $variant_doc]
                 $variant = $value,
            )*
        }

        impl $name {
            /// Converts this into its [`u8`] representation.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }

            /// Parses this from its [`u8`] representation.
            ///
            /// [`None`] is returned if the `value` matches no variant.
            #[must_use]
            pub const fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $(
                        v if v == Self::$variant.u8() => Some(Self::$variant),
                    )*
                    _ => None,
                }
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(INT2);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &[u8],
            ) -> Result<
                $name,
                Box<dyn ::std::error::Error
                    + ::core::marker::Sync
                    + ::core::marker::Send>,
            > {
                let v = u8::try_from(
                    <i16 as $crate::private::postgres_types::FromSql>::from_sql(
                        ty, raw,
                    )?,
                )?;
                Self::from_u8(v).ok_or_else(|| ::std::format!(
                    "invalid `{}` value: {v}",
                    ::core::stringify!($name),
                ).into())
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(INT2);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                $crate::private::postgres_types::ToSql::to_sql(
                    &i16::from(self.u8()),
                    ty,
                    w,
                )
            }
        }
    };
}
