use std::error::Error;
use std::fmt;

/// InputValueError is used if some bot option or parameter does not fulfill the posed
/// requirements, e.g., by exceeding the allowed countdown pause.
#[derive(Debug, Clone)]
pub struct InputValueError;

impl fmt::Display for InputValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid input value")
    }
}

impl Error for InputValueError {}

/// trim_discriminator returns the display name without the platform discriminator suffix,
/// i.e. everything from the first '#' onwards is cut off.
pub fn trim_discriminator(name: &str) -> &str {
    match name.find('#') {
        Some(idx) => &name[..idx],
        None => name,
    }
}
