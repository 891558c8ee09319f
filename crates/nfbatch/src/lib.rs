pub mod common;
pub mod config;
pub mod probe;
pub mod stack;

#[cfg(test)]
pub(crate) mod tests;

pub type Error = crate::common::error::NfError;
pub type Result<T> = std::result::Result<T, Error>;

pub const NF_VERSION: &str = {
    match option_env!("NF_BUILD_VERSION") {
        Some(version) => version,
        None => const_format::concatcp!(env!("CARGO_PKG_VERSION"), "-dev"),
    }
};
