use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{Client, Event, MqttOptions, Outgoing, Packet, QoS};

use imu_api::ApiError;

use crate::config::MqttSettings;
use crate::publish::Publish;
use crate::PipelineError;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const REQUEST_CAP: usize = 10;

/// Connect-publish-disconnect MQTT publisher.
///
/// Every `publish` opens a fresh connection with a unique client id, sends
/// one PUBLISH, waits for the delivery point of the configured QoS, sends
/// DISCONNECT and drops the socket. No connection outlives a call.
pub struct MqttPublisher {
    settings: MqttSettings,
    qos: QoS,
    name: String,
    seq: AtomicU64,
}

impl MqttPublisher {
    pub fn new(settings: MqttSettings) -> Result<Self, PipelineError> {
        settings.validate()?;
        let qos = qos_from_u8(settings.qos)?;
        let name = settings.addr();
        Ok(Self { settings, qos, name, seq: AtomicU64::new(0) })
    }

    fn next_client_id(&self) -> String {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{n}", self.settings.client_id, std::process::id())
    }

    fn options(&self) -> MqttOptions {
        let mut opts = MqttOptions::new(self.next_client_id(), self.settings.host.clone(), self.settings.port);
        opts.set_keep_alive(KEEP_ALIVE);
        opts.set_clean_session(true);
        if let Some(user) = self.settings.username.as_deref().filter(|u| !u.trim().is_empty()) {
            opts.set_credentials(user, self.settings.password.clone().unwrap_or_default());
        }
        opts
    }

    /// Whether `event` marks the publish as delivered for our QoS.
    fn delivered(&self, event: &Event) -> bool {
        matches!(
            (self.qos, event),
            (QoS::AtMostOnce, Event::Outgoing(Outgoing::Publish(_)))
                | (QoS::AtLeastOnce, Event::Incoming(Packet::PubAck(_)))
                | (QoS::ExactlyOnce, Event::Incoming(Packet::PubComp(_)))
        )
    }
}

impl Publish for MqttPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), ApiError> {
        let (client, mut connection) = Client::new(self.options(), REQUEST_CAP);
        client
            .publish(topic, self.qos, false, payload.to_vec())
            .map_err(|e| ApiError::io(format!("mqtt {}: enqueue publish: {e}", self.name)))?;

        let mut disconnecting = false;
        for notification in connection.iter() {
            let event = notification.map_err(|e| ApiError::io(format!("mqtt {}: {e}", self.name)))?;
            if matches!(event, Event::Outgoing(Outgoing::Disconnect)) {
                return Ok(());
            }
            if !disconnecting && self.delivered(&event) {
                client
                    .disconnect()
                    .map_err(|e| ApiError::io(format!("mqtt {}: disconnect: {e}", self.name)))?;
                disconnecting = true;
            }
        }
        Err(ApiError::io(format!("mqtt {}: connection closed before delivery", self.name)))
    }
}

fn qos_from_u8(qos: u8) -> Result<QoS, PipelineError> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(PipelineError::InvalidConfig {
            field: "qos",
            detail: format!("must be 0, 1 or 2, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imu_api::ErrorKind;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::JoinHandle;

    /// Read one MQTT control packet: (first header byte, body). `None` on EOF.
    fn read_packet(stream: &mut TcpStream) -> Option<(u8, Vec<u8>)> {
        let mut header = [0u8; 1];
        stream.read_exact(&mut header).ok()?;
        let mut len = 0usize;
        let mut shift = 0;
        loop {
            let mut b = [0u8; 1];
            stream.read_exact(&mut b).ok()?;
            len |= ((b[0] & 0x7f) as usize) << shift;
            if b[0] & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).ok()?;
        Some((header[0], body))
    }

    /// Single-connection loopback broker. Answers CONNECT with CONNACK and,
    /// for QoS 1 publishes, PUBLISH with PUBACK. Returns every packet seen.
    fn loopback_broker() -> (u16, JoinHandle<Vec<(u8, Vec<u8>)>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut seen = Vec::new();
            while let Some((header, body)) = read_packet(&mut stream) {
                match header >> 4 {
                    1 => stream.write_all(&[0x20, 0x02, 0x00, 0x00]).unwrap(),
                    3 if (header >> 1) & 0x03 == 1 => {
                        let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
                        let pkid = &body[2 + topic_len..4 + topic_len];
                        stream.write_all(&[0x40, 0x02, pkid[0], pkid[1]]).unwrap();
                    }
                    _ => {}
                }
                let done = header == 0xE0;
                seen.push((header, body));
                if done {
                    break;
                }
            }
            seen
        });
        (port, handle)
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn assert_transaction(qos: u8) {
        let (port, broker) = loopback_broker();
        let p = MqttPublisher::new(MqttSettings { port, qos, ..Default::default() }).unwrap();
        let payload: &[u8] = b"ax:1.5,ay:-2.0,az:0.25,gx:0.0,gy:1.0,gz:2.0,mx:3.0,my:4.0,mz:5.0,\
            nth:7,ts:1700000000.5,imuid:IMU1,cname:test";

        p.publish("aaac/campaign/imu", payload).unwrap();
        let seen = broker.join().unwrap();

        let kinds: Vec<u8> = seen.iter().map(|(h, _)| h >> 4).collect();
        assert_eq!(kinds, vec![1, 3, 14], "packets: {kinds:?}");
        let (publish_header, publish_body) = &seen[1];
        assert_eq!((publish_header >> 1) & 0x03, qos);
        assert!(contains(publish_body, b"aaac/campaign/imu"));
        assert!(contains(publish_body, payload));
        assert_eq!(seen[2].0, 0xE0);
    }

    #[test]
    fn qos_mapping() {
        assert_eq!(qos_from_u8(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(qos_from_u8(1).unwrap(), QoS::AtLeastOnce);
        assert_eq!(qos_from_u8(2).unwrap(), QoS::ExactlyOnce);
        assert!(qos_from_u8(3).is_err());
    }

    #[test]
    fn client_ids_are_unique_per_connection() {
        let p = MqttPublisher::new(MqttSettings::default()).unwrap();
        let a = p.next_client_id();
        let b = p.next_client_id();
        assert_ne!(a, b);
        assert!(a.starts_with("imu-gen-"));
        assert_eq!(p.name(), "127.0.0.1:1883");
    }

    #[test]
    fn delivery_point_follows_qos() {
        let at_most_once = MqttPublisher::new(MqttSettings::default()).unwrap();
        assert!(at_most_once.delivered(&Event::Outgoing(Outgoing::Publish(0))));
        assert!(!at_most_once.delivered(&Event::Outgoing(Outgoing::PingReq)));

        let at_least_once = MqttPublisher::new(MqttSettings { qos: 1, ..Default::default() }).unwrap();
        assert!(!at_least_once.delivered(&Event::Outgoing(Outgoing::Publish(1))));
    }

    #[test]
    fn unreachable_broker_is_io_error() {
        // nothing listens on port 1 on loopback
        let settings = MqttSettings { port: 1, ..Default::default() };
        let p = MqttPublisher::new(settings).unwrap();
        let err = p.publish("t/imu", b"ax:1.0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.message().contains("127.0.0.1:1"));
    }

    #[test]
    fn rejects_invalid_settings() {
        let settings = MqttSettings { host: " ".into(), ..Default::default() };
        assert!(MqttPublisher::new(settings).is_err());
    }

    #[test]
    fn connect_publish_disconnect_at_most_once() {
        assert_transaction(0);
    }

    #[test]
    fn connect_publish_disconnect_after_puback() {
        assert_transaction(1);
    }
}
