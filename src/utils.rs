// Utility modules

use rand::Rng;

use crate::{
    constants::{
        DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, ROBOT_NAME_CHARSET, ROBOT_NAME_PREFIX,
        ROBOT_NAME_SUFFIX_LEN,
    },
    error::{AppError, Result},
    models::Pagination,
};

/// Resolves `skip`/`limit` into concrete values, capping `limit` to keep list queries cheap.
pub fn resolve_page(page: Pagination) -> Result<(i64, i64)> {
    let skip = page.skip.unwrap_or(0);
    let limit = page.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    if skip < 0 {
        return Err(AppError::InvalidPayload("skip must be >= 0".to_string()));
    }
    if limit < 0 {
        return Err(AppError::InvalidPayload("limit must be >= 0".to_string()));
    }

    Ok((skip, limit.min(MAX_PAGE_LIMIT)))
}

/// Placeholder nickname for players the identity provider gives no profile for.
pub fn generate_robot_name() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ROBOT_NAME_SUFFIX_LEN)
        .map(|_| ROBOT_NAME_CHARSET[rng.random_range(0..ROBOT_NAME_CHARSET.len())] as char)
        .collect();
    format!("{}{}", ROBOT_NAME_PREFIX, suffix)
}
