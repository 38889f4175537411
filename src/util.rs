const MQTT_HOST: &str = "MQTT_HOST";

const MQTT_PORT: &str = "MQTT_PORT";

const MQTT_TOPIC: &str = "MQTT_TOPIC";

const DEFAULT_PORT: u16 = 1883;

pub fn get_default_port() -> u16 {
    DEFAULT_PORT
}

pub fn get_broker_host() -> Option<String> {
    std::env::var(MQTT_HOST).ok().filter(|host| !host.is_empty())
}

pub fn get_broker_port() -> Option<u16> {
    let port_from_env = std::env::var(MQTT_PORT);
    port_from_env.ok().and_then(|res| res.parse().ok())
}

pub fn get_topic() -> Option<String> {
    std::env::var(MQTT_TOPIC)
        .ok()
        .filter(|topic| !topic.is_empty())
}
