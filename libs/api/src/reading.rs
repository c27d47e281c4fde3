use crate::util::format_float;
use crate::ApiError;

/// Fixed key order of the wire payload. Consumers depend on it.
pub const WIRE_KEYS: [&str; 13] = [
    "ax", "ay", "az", "gx", "gy", "gz", "mx", "my", "mz", "nth", "ts", "imuid", "cname",
];

/// Channel names in wire order.
pub const CHANNELS: [&str; 9] = ["ax", "ay", "az", "gx", "gy", "gz", "mx", "my", "mz"];

/// One synthetic IMU sample: accelerometer, gyroscope and magnetometer
/// axes plus sequence, timestamp, device and run label.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// `[ax, ay, az, gx, gy, gz, mx, my, mz]`
    pub channels: [f64; 9],
    pub nth: i64,
    /// Seconds since the Unix epoch.
    pub ts: f64,
    pub imuid: String,
    pub cname: String,
}

impl Reading {
    /// Flatten into `ax:<v>,ay:<v>,...,imuid:<v>,cname:<v>` in `WIRE_KEYS` order.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(192);
        for (key, value) in CHANNELS.iter().zip(self.channels.iter()) {
            out.push_str(key);
            out.push(':');
            out.push_str(&format_float(*value));
            out.push(',');
        }
        out.push_str("nth:");
        out.push_str(&self.nth.to_string());
        out.push_str(",ts:");
        out.push_str(&format_float(self.ts));
        out.push_str(",imuid:");
        out.push_str(&self.imuid);
        out.push_str(",cname:");
        out.push_str(&self.cname);
        out
    }

    /// Parse a key/value payload back into a `Reading`.
    ///
    /// Tokens are comma separated, `key:value` or `key=value`; keys are
    /// case-insensitive and `imiid` is accepted for `imuid`. Token order is
    /// free, but every one of the 13 keys must be present.
    pub fn decode(payload: &str) -> Result<Self, ApiError> {
        let mut channels: [Option<f64>; 9] = [None; 9];
        let mut nth = None;
        let mut ts = None;
        let mut imuid = None;
        let mut cname = None;

        for part in payload.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part
                .split_once(&[':', '='][..])
                .ok_or_else(|| ApiError::format_err(format!("token without separator: {part:?}")))?;
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "nth" => nth = Some(value.parse::<i64>()?),
                "ts" => ts = Some(value.parse::<f64>()?),
                "imuid" | "imiid" => imuid = Some(value.to_string()),
                "cname" => cname = Some(value.to_string()),
                other => match CHANNELS.iter().position(|c| *c == other) {
                    Some(idx) => channels[idx] = Some(value.parse::<f64>()?),
                    None => return Err(ApiError::format_err(format!("unknown key: {other}"))),
                },
            }
        }

        let mut values = [0.0; 9];
        for (idx, slot) in channels.iter().enumerate() {
            values[idx] = slot.ok_or_else(|| missing(CHANNELS[idx]))?;
        }

        Ok(Self {
            channels: values,
            nth: nth.ok_or_else(|| missing("nth"))?,
            ts: ts.ok_or_else(|| missing("ts"))?,
            imuid: imuid.ok_or_else(|| missing("imuid"))?,
            cname: cname.ok_or_else(|| missing("cname"))?,
        })
    }
}

fn missing(key: &str) -> ApiError {
    ApiError::format_err(format!("missing key: {key}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn sample() -> Reading {
        Reading {
            channels: [1.5, -2.25, 3.0, -4.125, 5.0625, -6.0, 7.1, -8.2, 9.999999],
            nth: 42,
            ts: 1700000000.25,
            imuid: "IMU2".into(),
            cname: "test".into(),
        }
    }

    fn keys_of(payload: &str) -> Vec<&str> {
        payload
            .split(',')
            .map(|tok| tok.split_once(':').map(|(k, _)| k).unwrap_or(tok))
            .collect()
    }

    #[test]
    fn encode_exact_payload() {
        assert_eq!(
            sample().encode(),
            "ax:1.5,ay:-2.25,az:3.0,gx:-4.125,gy:5.0625,gz:-6.0,mx:7.1,my:-8.2,mz:9.999999,\
             nth:42,ts:1700000000.25,imuid:IMU2,cname:test"
        );
    }

    #[test]
    fn encode_keeps_fixed_key_order() {
        let mut r = sample();
        for (nth, label) in [(0, "a"), (-3, "run-b"), (i64::MAX, "")] {
            r.nth = nth;
            r.cname = label.into();
            r.channels = [0.0; 9];
            assert_eq!(keys_of(&r.encode()), WIRE_KEYS.to_vec());
        }
    }

    #[test]
    fn decode_accepts_equals_and_alias() {
        let payload = "AX=1.5, ay=-2.25,az=3,gx=-4.125,gy=5.0625,gz=-6,mx=7.1,my=-8.2,mz=9.999999,\
                       nth=42,ts=1700000000.25,imiid=IMU2,cname=test";
        assert_eq!(Reading::decode(payload).unwrap(), sample());
    }

    #[test]
    fn decode_reverses_encode() {
        let r = sample();
        assert_eq!(Reading::decode(&r.encode()).unwrap(), r);
    }

    #[test]
    fn decode_rejects_missing_key() {
        let payload = sample().encode().replace(",cname:test", "");
        let err = Reading::decode(&payload).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.message().contains("cname"));
    }

    #[test]
    fn decode_rejects_bad_number() {
        let payload = sample().encode().replace("ax:1.5", "ax:abc");
        assert_eq!(Reading::decode(&payload).unwrap_err().kind(), ErrorKind::Format);
    }

    #[test]
    fn decode_rejects_unknown_key() {
        let payload = format!("{},temp:20.0", sample().encode());
        assert_eq!(Reading::decode(&payload).unwrap_err().kind(), ErrorKind::Format);
    }
}
