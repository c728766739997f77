/// Codec quirks a [`crate::Document`] carries alongside its value tree, per
/// spec §3 and the JSON dialect knobs enumerated in §4.2. Shared between
/// `document` and `codec` (the `codec` crate's JSON dialect settings are
/// built from one of these) so a document doesn't need to know which codec
/// produced it to answer "how should I render a timestamp".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Honor `@jsonName` traits when naming object fields (restJson1 does;
    /// awsJson1_0/1_1 ignore it — spec §8 scenario 4).
    pub use_json_name: bool,
    pub timestamp_format: TimestampFormat,
    /// Render blob members as base64 strings rather than raw bytes.
    pub base64_blobs: bool,
    pub pretty_print: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    EpochSeconds,
    DateTime,
    HttpDate,
}

impl Settings {
    /// `awsJson1_0`/`awsJson1_1`: ignores `@jsonName`, epoch-seconds
    /// timestamps, no document type discriminator.
    pub fn aws_json() -> Self {
        Settings {
            use_json_name: false,
            timestamp_format: TimestampFormat::EpochSeconds,
            base64_blobs: true,
            pretty_print: false,
        }
    }

    /// `restJson1`: honors `@jsonName`, ISO-8601 timestamps by default.
    pub fn rest_json() -> Self {
        Settings {
            use_json_name: true,
            timestamp_format: TimestampFormat::DateTime,
            base64_blobs: true,
            pretty_print: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::rest_json()
    }
}
