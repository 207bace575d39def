use snafu::Snafu;

#[derive(Debug, Snafu)]
pub struct Error(OpaqueError);
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum OpaqueError {
    #[snafu(display(
        "Unable to convert {} '{}' from its generic form: {}",
        kind,
        name,
        source
    ))]
    FromGeneric {
        kind: String,
        name: String,
        source: serde_json::Error,
    },

    #[snafu(display("Unable to convert {} to its generic form: {}", kind, source))]
    ToGeneric {
        kind: String,
        source: serde_json::Error,
    },

    #[snafu(display(
        "Unable to convert {} to its generic form: expected a JSON object but got something else",
        kind
    ))]
    NotAnObject { kind: String },
}
