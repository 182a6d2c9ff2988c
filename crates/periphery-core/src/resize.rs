//! Resizing helpers for variable-length fields.

use crate::error::{ParamError, ParamResult};

/// Largest element count any variable-length field may grow to.
pub const MAX_ELEMENTS: usize = 1 << 20;

fn reserve<T>(values: &mut Vec<T>, new_len: usize) -> ParamResult<()> {
    if new_len > MAX_ELEMENTS {
        return Err(ParamError::Allocation { requested: new_len });
    }
    if new_len > values.len() {
        values
            .try_reserve(new_len - values.len())
            .map_err(|_| ParamError::Allocation { requested: new_len })?;
    }
    Ok(())
}

/// Resize `values` to `new_len`, preserving the leading elements.
///
/// New slots are default-initialised. Growth reserves first, so an
/// allocation failure leaves `values` untouched. Lengths above
/// [`MAX_ELEMENTS`] are refused.
pub fn resize_preserving<T: Default + Clone>(values: &mut Vec<T>, new_len: usize) -> ParamResult<()> {
    reserve(values, new_len)?;
    values.resize(new_len, T::default());
    Ok(())
}

/// Resize `values` to `new_len`, filling new slots from `fill`.
pub fn resize_with_preserving<T>(
    values: &mut Vec<T>,
    new_len: usize,
    fill: impl FnMut() -> T,
) -> ParamResult<()> {
    reserve(values, new_len)?;
    values.resize_with(new_len, fill);
    Ok(())
}
