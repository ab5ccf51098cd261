mod gpx;

use crate::error::ParseError;
use crate::types::track::ParsedTrack;

/// Parses a GPX payload into its ordered track points.
pub fn parse(bytes: &[u8]) -> Result<ParsedTrack, ParseError> {
    gpx::parse_gpx(bytes)
}
