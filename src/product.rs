//! Product identification strings.

/// Short product name.
pub const PRODUCT_NAME: &str = "Lodestar";

/// Edition shown in the long product title.
pub const PRODUCT_EDITION: &str = "Community Edition";

/// Program name used in usage output.
pub const PROGRAM_NAME: &str = "lodestar";

/// Footer printed under the help text.
pub const COPYRIGHT: &str = "(C) Lodestar contributors";

/// Build timestamp (`yyyyMMddHHmm`) injected by the build script.
pub const BUILD_TIMESTAMP: &str = env!("LODESTAR_BUILD_TIMESTAMP");

/// Short git commit of the build.
pub const GIT_COMMIT: &str = env!("LODESTAR_GIT_COMMIT");

/// `Major.Minor.Micro.Timestamp`
pub fn full_version() -> String {
    format!("{}.{}", env!("CARGO_PKG_VERSION"), BUILD_TIMESTAMP)
}

/// Product title used as the help header, e.g. `Lodestar 0.1.0`.
pub fn product_title() -> String {
    format!("{} {}", PRODUCT_NAME, env!("CARGO_PKG_VERSION"))
}

/// Name, edition and full version, as printed by `-version`.
pub fn long_product_title() -> String {
    format!("{} {} {}", PRODUCT_NAME, PRODUCT_EDITION, full_version())
}
