//! Military Grid Reference System strings
//!
//! An MGRS reference is `ZZB` (zone and latitude band, optional when the
//! caller supplies defaults), two 100 km square letters, and an even number of
//! digits split between easting and northing.

use super::CoordinateError;

const RESOLUTION_DIVISOR: [i64; 6] = [100_000, 10_000, 1_000, 100, 10, 1];

/// 100 km square letters, A through Z without I and O
const GRID_LETTERS: [char; 24] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z',
];

/// Latitude band letters, C through X without I and O
const BAND_LETTERS: [char; 20] = [
    'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W',
    'X',
];

/// Longest accepted MGRS reference: zone, band, square and 2x5 digits
const MAX_MGRS_LENGTH: usize = 15;

/// Highest number of digits per axis
pub const MAX_RESOLUTION: u32 = 5;

/// Format a UTM position as MGRS with `resolution` digits per axis (0 to 5).
///
/// Resolution 0 names only the 100 km square. Easting and northing must be
/// finite and not negative.
pub fn convert_utm_to_mgrs(
    easting: f64,
    northing: f64,
    zone: u32,
    band: char,
    resolution: u32,
) -> Result<String, CoordinateError> {
    if resolution > MAX_RESOLUTION {
        return Err(CoordinateError::InvalidResolution(resolution));
    }
    if !(easting.is_finite() && northing.is_finite() && easting >= 0.0 && northing >= 0.0) {
        return Err(CoordinateError::InvalidInput(format!(
            "UTM position ({easting}, {northing}) cannot be written as MGRS"
        )));
    }

    // Column letters repeat every three zones
    let column = i64::from((zone.max(1) - 1) % 3) * 8 + (easting / 100_000.0) as i64 - 1;
    let easting_letter = GRID_LETTERS[column.clamp(0, 23) as usize];

    // Row letters repeat every 2,000 km and alternate between odd and even zones
    let offset = if zone % 2 == 1 {
        northing % 2_000_000.0
    } else {
        (northing + 500_000.0) % 2_000_000.0
    };
    let row = (offset / 100_000.0) as i64;
    let northing_letter = GRID_LETTERS[row.clamp(0, 23) as usize];

    let mut result = format!("{zone:02}{band}{easting_letter}{northing_letter}");
    if resolution > 0 {
        let divisor = RESOLUTION_DIVISOR[resolution as usize];
        let width = resolution as usize;
        let easting_num = ((easting as i64) % 100_000) / divisor;
        let northing_num = ((northing as i64) % 100_000) / divisor;
        result.push_str(&format!("{easting_num:0width$}{northing_num:0width$}"));
    }
    Ok(result.trim().to_string())
}

/// Letter position in the MGRS alphabet (I and O skipped)
fn letter_offset(letter: char) -> f64 {
    let mut value = f64::from(u32::from(letter).saturating_sub(u32::from('A')));
    if letter > 'O' {
        value -= 1.0;
    }
    if letter > 'I' {
        value -= 1.0;
    }
    value
}

/// Parse an MGRS reference into (zone, easting, northing).
///
/// When the reference has no zone prefix, `default_zone` and `default_band`
/// are used.
pub fn convert_mgrs_to_utm(
    default_zone: u32,
    default_band: char,
    mgrs: &str,
) -> Result<(u32, f64, f64), CoordinateError> {
    let chars: Vec<char> = mgrs.chars().collect();
    if chars.len() > MAX_MGRS_LENGTH {
        return Err(CoordinateError::InvalidInput(format!(
            "MGRS reference '{mgrs}' is longer than {MAX_MGRS_LENGTH} characters"
        )));
    }

    let (zone, band, working) = if chars.len() % 2 == 1 {
        if !(chars.len() >= 3
            && chars[0].is_ascii_digit()
            && chars[1].is_ascii_digit()
            && chars[2].is_ascii_alphabetic())
        {
            return Err(CoordinateError::InvalidInput(format!(
                "MGRS reference '{mgrs}' must begin with 2 digits followed by a letter"
            )));
        }
        let zone = chars[0].to_digit(10).unwrap_or(0) * 10 + chars[1].to_digit(10).unwrap_or(0);
        (zone, chars[2], &chars[3..])
    } else {
        (default_zone, default_band, &chars[..])
    };

    if zone == 0 || zone > 60 {
        return Err(CoordinateError::InvalidInput(format!(
            "MGRS reference '{mgrs}' has zone {zone}, expected 1 to 60"
        )));
    }

    if !(working.len() >= 2 && working[0].is_ascii_alphabetic() && working[1].is_ascii_alphabetic())
    {
        return Err(CoordinateError::InvalidInput(format!(
            "the intra-zone grid designations of '{mgrs}' must be letters"
        )));
    }

    let digits = &working[2..];
    if !digits.iter().all(char::is_ascii_digit) {
        return Err(CoordinateError::InvalidInput(format!(
            "all characters following the zone designations of '{mgrs}' must be digits"
        )));
    }
    if digits.len() % 2 != 0 {
        return Err(CoordinateError::InvalidInput(format!(
            "MGRS reference '{mgrs}' has an odd number of digits"
        )));
    }

    let num_len = digits.len() / 2;
    if num_len > MAX_RESOLUTION as usize {
        return Err(CoordinateError::InvalidInput(format!(
            "MGRS reference '{mgrs}' has more than {MAX_RESOLUTION} digits per axis"
        )));
    }

    let parse_half = |half: &[char]| -> i64 {
        half.iter()
            .filter_map(|c| c.to_digit(10))
            .fold(0_i64, |acc, d| acc * 10 + i64::from(d))
    };
    let divisor = RESOLUTION_DIVISOR[num_len];
    let easting_num = parse_half(&digits[..num_len]) * divisor;
    let northing_num = parse_half(&digits[num_len..]) * divisor;

    let band = band.to_ascii_uppercase();
    if !BAND_LETTERS.contains(&band) {
        return Err(CoordinateError::InvalidInput(format!(
            "MGRS reference '{mgrs}' has latitude band '{band}', expected C to X without I and O"
        )));
    }

    let easting_char = working[0].to_ascii_uppercase();
    let northing_char = working[1].to_ascii_uppercase();
    if !(GRID_LETTERS.contains(&easting_char) && GRID_LETTERS.contains(&northing_char)) {
        return Err(CoordinateError::InvalidInput(format!(
            "the 100 km square letters of '{mgrs}' cannot be I or O"
        )));
    }

    let mut northing = letter_offset(northing_char) * 100_000.0 + northing_num as f64;
    if zone % 2 == 0 {
        northing -= 500_000.0;
        if northing < 0.0 {
            northing += 2_000_000.0;
        }
    }

    // Latitude at the bottom of the band, degrees
    let deg_base = (letter_offset(band) - 3.0) * 8.0 - 72.0;
    northing += band_northing_offset(deg_base, northing);

    let mut easting = letter_offset(easting_char) + 1.0;
    easting -= f64::from(((zone - 1) % 3) * 8);
    easting *= 100_000.0;
    easting += easting_num as f64;

    Ok((zone, easting, northing))
}

/// Multiple of 2,000 km to add to a row northing for a latitude band.
///
/// The row letters repeat, so the band's base latitude picks the cycle. Bands
/// that straddle a cycle boundary use the northing itself to decide.
fn band_northing_offset(deg_base: f64, northing: f64) -> f64 {
    let low_in_cycle = northing < 1_000_000.0;
    if deg_base >= 0.0 {
        if deg_base >= 71.64 {
            8_000_000.0
        } else if deg_base >= 53.91 {
            if deg_base > 63.0 && low_in_cycle {
                8_000_000.0
            } else {
                6_000_000.0
            }
        } else if deg_base >= 36.02 {
            if deg_base > 45.0 && low_in_cycle {
                6_000_000.0
            } else {
                4_000_000.0
            }
        } else if deg_base >= 18.03 {
            if deg_base > 28.0 && low_in_cycle {
                4_000_000.0
            } else {
                2_000_000.0
            }
        } else if deg_base > 10.0 && low_in_cycle {
            2_000_000.0
        } else {
            0.0
        }
    } else if deg_base >= -18.03 {
        8_000_000.0
    } else if deg_base >= -36.02 {
        if deg_base > -28.0 && low_in_cycle {
            8_000_000.0
        } else {
            6_000_000.0
        }
    } else if deg_base >= -53.91 {
        if deg_base > -45.0 && low_in_cycle {
            6_000_000.0
        } else {
            4_000_000.0
        }
    } else if deg_base >= -71.64 {
        if deg_base > -63.0 && low_in_cycle {
            4_000_000.0
        } else {
            2_000_000.0
        }
    } else if deg_base > -81.0 && low_in_cycle {
        2_000_000.0
    } else {
        0.0
    }
}
