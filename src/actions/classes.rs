use serde::Deserialize;
use serde_json::Value;

use super::{millis, ms};
use crate::error::Result;
use crate::player::{Next, Player};
use crate::registry::{ActionRegistry, ActionSpec, parse_options};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClassOptions {
    selector: String,
    class: String,
    #[serde(deserialize_with = "millis")]
    wait: u64,
}

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("addClass", ActionSpec::new(|player, options, next| {
        toggle_class(player, options, next, "addClass", true)
    }));
    registry.register("removeClass", ActionSpec::new(|player, options, next| {
        toggle_class(player, options, next, "removeClass", false)
    }));
}

fn toggle_class(player: &mut Player, options: &Value, next: Next, action: &str, add: bool) -> Result<()> {
    let options: ClassOptions = parse_options(action, options)?;
    let stage = player.stage_mut();
    if add {
        stage.add_class(&options.selector, &options.class);
    } else {
        stage.remove_class(&options.selector, &options.class);
    }
    player.schedule_next(ms(options.wait), next);
    Ok(())
}
