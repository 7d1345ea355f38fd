use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, TelloError};

/// One decoded reading from the drone's state broadcast.
///
/// Fields missing from a message keep their zero default. Keys this crate
/// does not know about are kept verbatim in `unrecognized` so newer firmware
/// does not break decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    /// Mission pad id, -1 when no pad is detected
    pub mid: i32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Mission pad pitch, roll and yaw exactly as sent, eg "0,0,0"
    pub mpry: String,
    /// degrees
    pub pitch: i32,
    pub roll: i32,
    pub yaw: i32,
    /// velocity
    pub vgx: i32,
    pub vgy: i32,
    pub vgz: i32,
    /// lowest and highest temperature, °C
    pub templ: i32,
    pub temph: i32,
    /// time of flight distance, mm
    pub tof: i32,
    /// height, cm
    pub h: i32,
    /// battery, percent
    pub bat: u8,
    /// barometer
    pub baro: f32,
    /// motor time, seconds
    pub time: i32,
    /// acceleration, mg
    pub agx: f32,
    pub agy: f32,
    pub agz: f32,
    pub unrecognized: BTreeMap<String, String>,
}

impl StatusSnapshot {
    /// Decodes a raw state datagram.
    ///
    /// The whole datagram is rejected if any part of it fails to decode, so
    /// a snapshot never carries a half-parsed field.
    pub fn decode(raw: &[u8]) -> Result<StatusSnapshot> {
        if !raw.is_ascii() {
            return Err(TelloError::DecodeError { msg: "message is not ASCII".to_string() });
        }
        let s = std::str::from_utf8(raw)
            .map_err(|e| TelloError::DecodeError { msg: format!("{e}") })?;
        Self::from_message(s)
    }

    /// Parses a state string received from the drone.
    ///
    /// Example message:
    /// "mid:-1;x:-100;y:-100;z:-100;mpry:-1,-1,-1;pitch:0;roll:0;yaw:-3;vgx:0;vgy:0;vgz:1;templ:58;temph:60;tof:71;h:50;bat:82;baro:-57.14;time:14;agx:17.00;agy:-4.00;agz:-956.00;"
    ///
    pub fn from_message(s: &str) -> Result<StatusSnapshot> {
        let mut fields: Vec<&str> = s.trim().split(';').collect();

        // the protocol terminates every field, including the last one
        if fields.last() == Some(&"") {
            fields.pop();
        }

        if fields.is_empty() {
            return Err(TelloError::DecodeError { msg: "empty message".to_string() });
        }

        let mut status = StatusSnapshot::default();

        for f in fields {
            let (k, v) = split_key_value(f)?;

            match k {
                "mid" => status.mid = value_as(k, v)?,
                "x" => status.x = value_as(k, v)?,
                "y" => status.y = value_as(k, v)?,
                "z" => status.z = value_as(k, v)?,
                "mpry" => status.mpry = v.to_string(),
                "pitch" => status.pitch = value_as(k, v)?,
                "roll" => status.roll = value_as(k, v)?,
                "yaw" => status.yaw = value_as(k, v)?,
                "vgx" => status.vgx = value_as(k, v)?,
                "vgy" => status.vgy = value_as(k, v)?,
                "vgz" => status.vgz = value_as(k, v)?,
                "templ" => status.templ = value_as(k, v)?,
                "temph" => status.temph = value_as(k, v)?,
                "tof" => status.tof = value_as(k, v)?,
                "h" => status.h = value_as(k, v)?,
                "bat" => status.bat = value_as(k, v)?,
                "baro" => status.baro = value_as(k, v)?,
                "time" => status.time = value_as(k, v)?,
                "agx" => status.agx = value_as(k, v)?,
                "agy" => status.agy = value_as(k, v)?,
                "agz" => status.agz = value_as(k, v)?,
                _ => {
                    status.unrecognized.insert(k.to_string(), v.to_string());
                }
            }
        }

        Ok(status)
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mid: {}", self.mid)?;
        writeln!(f, "x: {}", self.x)?;
        writeln!(f, "y: {}", self.y)?;
        writeln!(f, "z: {}", self.z)?;
        writeln!(f, "mpry: {}", self.mpry)?;
        writeln!(f, "pitch: {}", self.pitch)?;
        writeln!(f, "roll: {}", self.roll)?;
        writeln!(f, "yaw: {}", self.yaw)?;
        writeln!(f, "vgx: {}", self.vgx)?;
        writeln!(f, "vgy: {}", self.vgy)?;
        writeln!(f, "vgz: {}", self.vgz)?;
        writeln!(f, "templ: {}", self.templ)?;
        writeln!(f, "temph: {}", self.temph)?;
        writeln!(f, "tof: {}", self.tof)?;
        writeln!(f, "h: {}", self.h)?;
        writeln!(f, "bat: {}", self.bat)?;
        writeln!(f, "baro: {}", self.baro)?;
        writeln!(f, "time: {}", self.time)?;
        writeln!(f, "agx: {}", self.agx)?;
        writeln!(f, "agy: {}", self.agy)?;
        write!(f, "agz: {}", self.agz)?;
        for (k, v) in &self.unrecognized {
            write!(f, "\n{k}: {v}")?;
        }
        Ok(())
    }
}

fn split_key_value(kv: &str) -> Result<(&str, &str)> {
    kv.split_once(':')
        .ok_or_else(|| TelloError::DecodeError { msg: format!("no key in field {kv:?}") })
}

fn value_as<T: FromStr>(k: &str, v: &str) -> Result<T> {
    v.parse::<T>()
        .map_err(|_| TelloError::DecodeError { msg: format!("bad value for {k}: {v:?}") })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_MESSAGE: &str = "mid:-1;x:-100;y:-100;z:-100;mpry:-1,-1,-1;pitch:0;roll:0;yaw:-3;vgx:0;vgy:0;vgz:1;templ:58;temph:60;tof:71;h:50;bat:82;baro:-57.14;time:14;agx:17.00;agy:-4.00;agz:-956.00;\r\n";

    #[test]
    fn test_decode_full_message() {
        let status = StatusSnapshot::decode(FULL_MESSAGE.as_bytes()).unwrap();

        assert_eq!(status.mid, -1);
        assert_eq!(status.x, -100);
        assert_eq!(status.mpry, "-1,-1,-1");
        assert_eq!(status.yaw, -3);
        assert_eq!(status.vgz, 1);
        assert_eq!(status.templ, 58);
        assert_eq!(status.temph, 60);
        assert_eq!(status.tof, 71);
        assert_eq!(status.h, 50);
        assert_eq!(status.bat, 82);
        assert_eq!(status.baro, -57.14);
        assert_eq!(status.time, 14);
        assert_eq!(status.agx, 17.0);
        assert_eq!(status.agy, -4.0);
        assert_eq!(status.agz, -956.0);
        assert!(status.unrecognized.is_empty());
    }

    #[test]
    fn test_decode_partial_message_ignores_trailing_separator() {
        let status =
            StatusSnapshot::from_message("mid:257;x:0;y:0;z:0;pitch:-1;roll:0;yaw:0;bat:100;")
                .unwrap();

        assert_eq!(status.mid, 257);
        assert_eq!(status.pitch, -1);
        assert_eq!(status.bat, 100);
        assert_eq!(status.mpry, "");
    }

    #[test]
    fn test_mpry_kept_as_text() {
        let status = StatusSnapshot::from_message("mpry:12,-3,45;").unwrap();
        assert_eq!(status.mpry, "12,-3,45");
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let status = StatusSnapshot::from_message("bat:50;wifi:90;ver:1.2:3;").unwrap();

        assert_eq!(status.bat, 50);
        assert_eq!(status.unrecognized.get("wifi").map(String::as_str), Some("90"));
        // only the first ':' separates key from value
        assert_eq!(status.unrecognized.get("ver").map(String::as_str), Some("1.2:3"));
    }

    #[test]
    fn test_non_numeric_value_rejects_message() {
        let result = StatusSnapshot::from_message("mid:1;bat:abc;");
        assert!(matches!(result, Err(TelloError::DecodeError { .. })));
    }

    #[test]
    fn test_out_of_range_battery_rejected() {
        assert!(StatusSnapshot::from_message("bat:300;").is_err());
    }

    #[test]
    fn test_field_without_colon_rejected() {
        assert!(StatusSnapshot::from_message("mid:1;garbage;").is_err());
    }

    #[test]
    fn test_empty_message_rejected() {
        assert!(StatusSnapshot::from_message("").is_err());
        assert!(StatusSnapshot::from_message(";").is_err());
    }

    #[test]
    fn test_non_ascii_rejected() {
        assert!(StatusSnapshot::decode("bat:5°;".as_bytes()).is_err());
        assert!(StatusSnapshot::decode(&[0x62, 0x61, 0x74, 0x3a, 0xff]).is_err());
    }

    #[test]
    fn test_display_lists_every_field() {
        let status = StatusSnapshot::from_message("bat:77;extra:x;").unwrap();
        let text = status.to_string();

        assert!(text.starts_with("mid: 0\n"));
        assert!(text.contains("\nbat: 77\n"));
        assert!(text.ends_with("\nextra: x"));
    }
}
