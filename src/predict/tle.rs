use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::error::TleError;

/// One parsed three-line element set. Fields are derived once at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrbitalElementSet {
    pub name: String,
    pub line1: String,
    pub line2: String,
    /// NORAD id, line 1 columns 3-7
    pub catalog_number: String,
    /// line 2 columns 53-63
    pub mean_motion_rev_per_day: f64,
    /// raw epoch text, line 1 columns 19-32
    pub epoch: String,
}

impl OrbitalElementSet {
    pub fn from_lines(name: &str, line1: &str, line2: &str) -> Result<Self, TleError> {
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();

        if !line1.starts_with("1 ") {
            return Err(TleError::BadMarker { line: 1 });
        }
        if !line2.starts_with("2 ") {
            return Err(TleError::BadMarker { line: 2 });
        }

        let catalog_number = columns(line1, 3, 7).ok_or(TleError::ShortLine(1))?.trim();
        if catalog_number.is_empty() || !catalog_number.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TleError::CatalogNumber(catalog_number.to_string()));
        }
        let epoch = columns(line1, 19, 32).ok_or(TleError::ShortLine(1))?.trim();

        let mean_motion = columns(line2, 53, 63).ok_or(TleError::ShortLine(2))?.trim();
        let mean_motion_rev_per_day: f64 = mean_motion
            .parse()
            .map_err(|_| TleError::MeanMotion(mean_motion.to_string()))?;

        let name = name.trim();
        let name = if name.is_empty() {
            format!("NORAD {}", catalog_number)
        } else {
            name.to_string()
        };

        Ok(Self {
            name,
            line1: line1.to_string(),
            line2: line2.to_string(),
            catalog_number: catalog_number.to_string(),
            mean_motion_rev_per_day,
            epoch: epoch.to_string(),
        })
    }

    /// Numeric NORAD id, if the catalog number is purely numeric (alpha-5 ids are not).
    pub fn norad_id(&self) -> Option<u32> {
        self.catalog_number.parse().ok()
    }

    pub fn orbital_period_minutes(&self) -> Option<f64> {
        (self.mean_motion_rev_per_day > 0.0).then(|| 1440.0 / self.mean_motion_rev_per_day)
    }
}

/// 1-based inclusive column range, as the TLE format documents it.
fn columns(line: &str, first: usize, last: usize) -> Option<&str> {
    line.get(first - 1..last)
}

/// Parse a feed of three-line records. Malformed records are skipped and the scan
/// resynchronises on the next line, so a partially corrupted feed still yields
/// every valid record it contains.
pub fn parse_tle_text(content: &str) -> Vec<OrbitalElementSet> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if i + 2 < lines.len()
            && !lines[i].starts_with("1 ")
            && !lines[i].starts_with("2 ")
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            match OrbitalElementSet::from_lines(lines[i], lines[i + 1], lines[i + 2]) {
                Ok(set) => result.push(set),
                Err(e) => log::debug!("Skipping TLE record {:?}: {}", lines[i], e),
            }
            i += 3;
        } else {
            log::debug!("Skipping unexpected TLE line: {:?}", lines[i]);
            i += 1;
        }
    }

    result
}
