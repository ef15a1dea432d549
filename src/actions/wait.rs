use serde::Deserialize;
use serde_json::Value;

use super::{millis, ms};
use crate::error::Result;
use crate::player::{Next, Player, WaiterOrigin};
use crate::registry::{ActionRegistry, ActionSpec, parse_options};

#[derive(Debug, Deserialize)]
struct WaitOptions {
    #[serde(default = "default_timeout", deserialize_with = "millis")]
    timeout: u64,
}

const fn default_timeout() -> u64 {
    100
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClickOptions {
    selector: String,
    /// Continue anyway after this long; 0 waits forever.
    #[serde(deserialize_with = "millis")]
    timeout: u64,
}

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("wait", ActionSpec::new(wait));
    registry.register("waitForClickOn", ActionSpec::new(wait_for_click_on));
}

fn wait(player: &mut Player, options: &Value, next: Next) -> Result<()> {
    let options: WaitOptions = parse_options("wait", options)?;
    player.schedule_next(ms(options.timeout), next);
    Ok(())
}

pub(super) fn wait_for_click_on(player: &mut Player, options: &Value, next: Next) -> Result<()> {
    if player.is_fast_forward() {
        player.proceed(next);
        return Ok(());
    }
    let options: ClickOptions = parse_options("waitForClickOn", options)?;
    let id = player.wait_for_click(&options.selector, WaiterOrigin::Element, move |player| {
        next.run(player)
    });
    if options.timeout > 0 {
        player.release_after(id, ms(options.timeout));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timeout_accepts_numeric_strings() {
        let options: WaitOptions = parse_options("wait", &json!({"timeout": "2500"})).unwrap();
        assert_eq!(options.timeout, 2500);
        let options: WaitOptions = parse_options("wait", &Value::Null).unwrap();
        assert_eq!(options.timeout, 100);
    }

    #[test]
    fn test_click_options_default_to_no_timeout() {
        let options: ClickOptions = parse_options("waitForClickOn", &json!({"selector": ".run"})).unwrap();
        assert_eq!(options.selector, ".run");
        assert_eq!(options.timeout, 0);
    }
}
