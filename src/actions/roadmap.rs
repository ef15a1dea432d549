use serde::Deserialize;
use serde_json::Value;

use super::{millis, ms};
use crate::error::Result;
use crate::player::{Next, Player};
use crate::registry::{ActionRegistry, ActionSpec, parse_options};
use crate::stage::{Progress, StepTarget};

#[derive(Debug, Deserialize)]
struct SetStepOptions {
    #[serde(default)]
    step: StepTarget,
    #[serde(default = "default_wait", deserialize_with = "millis")]
    wait: u64,
}

const fn default_wait() -> u64 {
    1000
}

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("setStep", ActionSpec::new(set_step).reversible());
}

/// Highlight a roadmap step, completing the ones before it.
fn set_step(player: &mut Player, options: &Value, next: Next) -> Result<()> {
    let options: SetStepOptions = parse_options("setStep", options)?;
    let wait = if player.is_fast_forward() { 0 } else { options.wait };
    let progress = player.stage().roadmap.resolve(options.step);

    player.add_cleanup(move |player| player.stage_mut().roadmap.set(progress));
    player.stage_mut().roadmap.begin(progress);

    if progress == Progress::AllCompleted {
        player.schedule(ms(wait), move |player| {
            player.stage_mut().roadmap.settle();
            player.schedule_next(ms(wait), next);
            Ok(())
        });
    } else {
        player.schedule(ms(wait), move |player| {
            player.stage_mut().roadmap.settle();
            next.run(player)
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::AllSteps;
    use serde_json::json;

    #[test]
    fn test_step_accepts_number_or_all() {
        let numbered: SetStepOptions = parse_options("setStep", &json!({"step": 3})).unwrap();
        assert_eq!(numbered.step, StepTarget::Number(3));
        assert_eq!(numbered.wait, 1000);
        let all: SetStepOptions = parse_options("setStep", &json!({"step": "all", "wait": 0})).unwrap();
        assert_eq!(all.step, StepTarget::Keyword(AllSteps::All));
        assert_eq!(all.wait, 0);
    }
}
