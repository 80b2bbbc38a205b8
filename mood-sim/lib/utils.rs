//! Output helpers for binaries.

use thiserror::Error;

pub use ndarray_npy;

/// Errors from writing output files.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("could not open output file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not write npz archive: {0}")]
    Npz(#[from] ndarray_npy::WriteNpzError),
}

/// Create a directory and all its parents, evaluating to an
/// `std::io::Result<()>`.
#[macro_export]
macro_rules! mkdir {
    ( $dir:expr ) => {
        std::fs::create_dir_all(&$dir)
    }
}

/// Write a set of arrays to a single `.npz` archive, evaluating to a
/// `Result<(), OutputError>`.
///
/// ```ignore
/// write_npz!(
///     outdir.join("run.npz"),
///     arrays: {
///         "time" => &time,
///         "p_neutral" => &p_neutral,
///     }
/// )?;
/// ```
#[macro_export]
macro_rules! write_npz {
    (
        $filename:expr,
        arrays: { $( $name:expr => $arr:expr ),* $(,)? }
    ) => {
        (|| -> Result<(), $crate::utils::OutputError> {
            let _file_ = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open($filename)?;
            let mut _npz_ = $crate::utils::ndarray_npy::NpzWriter::new(_file_);
            $( _npz_.add_array($name, $arr)?; )*
            _npz_.finish()?;
            Ok(())
        })()
    }
}
