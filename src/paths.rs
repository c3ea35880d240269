use std::{path::PathBuf, sync::LazyLock};

pub static DEFAULT_APP_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    let mut path = dirs::home_dir().unwrap_or_default();

    if std::env::var("SCALERKIT_XDG_PATH").is_ok() {
        path.push(".config")
    }

    path.push("ScalerKit");
    path
});

/// Computes a path inside the ScalerKit data directory.
///
/// Returns a `&Path` referencing the data directory itself if no arguments are passed in, or a
/// `PathBuf` created by joining all of the arguments to the base directory if at least one
/// argument is passed in.
///
/// # Examples
///
/// ```no_run
/// // Assuming `SCALERKIT_XDG_PATH` is not set, the data directory is ~/ScalerKit
/// let home = dirs::home_dir().unwrap_or_default();
/// assert_eq!(scalerkit::app_path!(), home.join("ScalerKit").as_path());
/// assert_eq!(scalerkit::app_path!("cache", "x"), home.join("ScalerKit").join("cache").join("x"));
/// ```
#[macro_export]
macro_rules! app_path {
    () => {
        $crate::paths::DEFAULT_APP_PATH.as_path()
    };

    ( $( $path:expr ),+ $(,)? ) => {
        [
            $crate::paths::DEFAULT_APP_PATH.as_path(),
            $( std::path::Path::new(&$path) ),+
        ].into_iter().collect::<std::path::PathBuf>()
    };
}
