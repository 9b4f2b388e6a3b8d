use crate::visit::Device;

/// Classify a `User-Agent` string into [`Device`].
///
/// Tablets are recognised by signature first because `woothee` reports iPads
/// and Android tablets as `smartphone`. Everything `woothee` calls
/// `smartphone` or `mobilephone` is mobile; anything else, including strings
/// it cannot parse, is desktop.
pub fn classify_device(user_agent: &str) -> Device {
    if user_agent.is_empty() {
        return Device::Desktop;
    }

    if is_tablet(user_agent) {
        return Device::Tablet;
    }

    match woothee::parser::Parser::new().parse(user_agent) {
        Some(result) => match result.category {
            "smartphone" | "mobilephone" => Device::Mobile,
            _ => Device::Desktop,
        },
        None => Device::Desktop,
    }
}

fn is_tablet(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    ua.contains("ipad")
        || ua.contains("tablet")
        || ua.contains("kindle")
        || ua.contains("silk/")
        || (ua.contains("android") && !ua.contains("mobile"))
}
