//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Helper type to use in `#[graphql(with = ..)]` attribute, representing a
/// domain value as a GraphQL string scalar.
///
/// Relies on [`FromStr`]/[`Display`] impls of the `As` domain type, so the
/// validation rules of the domain type apply to the GraphQL input as well.
///
/// Target type must implement [`TryFrom`] and [`AsRef`] for `As` type.
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Converts the target type into a string scalar [`Value`].
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Constructs the target type from a string scalar [`InputValue`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the input value is not a string;
    /// - the input value cannot be parsed into `As` type;
    /// - the parsed value cannot be converted into the target type.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        let name = name::<T, S>();
        let s = input.as_string_value().ok_or_else(|| {
            format!(
                "Cannot parse input scalar `{name}`: expected string input \
                 value, found: {input}",
            )
        })?;
        s.parse::<As>()
            .map_err(|e| {
                format!("Cannot parse input scalar `{name}` from \"{s}\": {e}")
            })?
            .try_into()
            .map_err(|e| format!("Cannot parse input scalar `{name}`: {e}"))
    }

    /// Parses the provided [`ScalarToken`] as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be parsed as [`String`].
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}

/// Returns the GraphQL name of the `T` scalar.
fn name<T, S>() -> String
where
    T: GraphQLType<S, TypeInfo = ()>,
    S: ScalarValue,
{
    T::name(&()).map_or_else(|| "<unnamed>".to_owned(), |n| n.to_string())
}
