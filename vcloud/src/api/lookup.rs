//! Name-or-ID entity resolution shared by every resource family

use std::future::Future;

use super::error::ApiError;

/// Resolves `identifier` by ID first, then by name.
///
/// The name lookup only runs when the ID lookup fails with a not-found error;
/// every other failure is returned as is.
pub async fn get_entity_by_name_or_id<'a, T, I, N, FI, FN>(
    identifier: &'a str,
    by_id: I,
    by_name: N,
) -> Result<T, ApiError>
where
    I: FnOnce(&'a str) -> FI,
    N: FnOnce(&'a str) -> FN,
    FI: Future<Output = Result<T, ApiError>>,
    FN: Future<Output = Result<T, ApiError>>,
{
    if identifier.is_empty() {
        return Err(ApiError::InvalidRequest(
            "empty name or ID given".to_string(),
        ));
    }

    match by_id(identifier).await {
        Ok(entity) => Ok(entity),
        Err(e) if e.is_not_found() => {
            tracing::debug!("'{}' not found by ID, trying by name", identifier);
            by_name(identifier).await
        }
        Err(e) => Err(e),
    }
}

/// Picks the single element whose name matches, failing on zero or many matches
pub(crate) fn unique_by_name<'a, T, F>(
    items: &'a [T],
    kind: &'static str,
    name: &str,
    name_of: F,
) -> Result<&'a T, ApiError>
where
    F: Fn(&T) -> &str,
{
    let mut found = items.iter().filter(|item| name_of(item) == name);
    match (found.next(), found.next()) {
        (Some(item), None) => Ok(item),
        (None, _) => Err(ApiError::not_found(kind, name)),
        (Some(_), Some(_)) => Err(ApiError::InvalidRequest(format!(
            "more than one {} named '{}' found",
            kind, name
        ))),
    }
}
