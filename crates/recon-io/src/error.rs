/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// Invalid file extension.
    #[error("File does not have a valid extension: {0}")]
    InvalidFileExtension(std::path::PathBuf),

    /// Error to open the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to create the image.
    #[error("Failed to create image. {0}")]
    ImageCreationError(#[from] recon_image::ImageError),

    /// The decoded image has no pixels.
    #[error("Decoded image is empty: {0}")]
    EmptyImage(std::path::PathBuf),

    /// The two images of a frame differ in size.
    #[error("Frame images must have the same size: {0} != {1}")]
    FrameSizeMismatch(recon_image::ImageSize, recon_image::ImageSize),

    /// Error to encode the PNG image.
    #[error("Failed to encode the png image. {0}")]
    PngEncodingError(String),

    /// Error to decode the PNG image.
    #[error("Failed to decode the png image. {0}")]
    PngDecodeError(String),

    /// Error to parse or write a JSON document.
    #[error("Failed to process the json file. {0}")]
    JsonError(#[from] serde_json::Error),
}
