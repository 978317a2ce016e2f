//! Mapping of input events to actions.
//!
//! The router is built once from the validated configuration and never
//! changes. It does no filtering or rate limiting beyond selecting the
//! configured trigger edge of each button.
//!
//! | Input   | Event                 | Action                     |
//! |---------|-----------------------|----------------------------|
//! | Button  | configured edge       | the button's action        |
//! | Button  | other edge            | none                       |
//! | Encoder | clockwise tick        | cw action                  |
//! | Encoder | counter-clockwise tick| ccw action                 |

use std::collections::HashMap;

use crate::commands::{Action, InputId};
use crate::config::{Config, TriggerEdge};
use crate::debounce::Transition;
use crate::quadrature::Rotation;

/// A logical event produced by a watcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// A debounced button transition.
    Button(Transition),
    /// A completed encoder detent.
    Encoder(Rotation),
}

#[derive(Clone, Copy, Debug)]
enum Route {
    Button { edge: TriggerEdge, action: Action },
    Encoder { ccw: Action, cw: Action },
}

/// Immutable `(input, event) -> action` table.
///
/// ```
/// use rs_gpio_mpdc::config::{ButtonConfig, Config, PinSpec, PullMode, TriggerEdge};
/// use rs_gpio_mpdc::debounce::Transition;
/// use rs_gpio_mpdc::router::{EventRouter, InputEvent};
/// use rs_gpio_mpdc::{Action, InputId};
///
/// let config = Config::default().with_button(ButtonConfig::new(
///     0,
///     PinSpec::new(23, PullMode::Up).unwrap(),
///     TriggerEdge::Release,
///     Action::NextTrack,
/// ));
/// let router = EventRouter::from_config(&config);
///
/// let id = InputId::Button(0);
/// assert_eq!(router.route(id, InputEvent::Button(Transition::Activated)), None);
/// assert_eq!(router.route(id, InputEvent::Button(Transition::Released)), Some(Action::NextTrack));
/// ```
#[derive(Clone, Debug, Default)]
pub struct EventRouter {
    routes: HashMap<InputId, Route>,
}

impl EventRouter {
    /// Build the table from configuration.
    pub fn from_config(config: &Config) -> Self {
        let buttons = config.buttons.iter().map(|b| {
            (
                b.input_id(),
                Route::Button {
                    edge: b.edge,
                    action: b.action,
                },
            )
        });
        let encoders = config.encoders.iter().map(|e| {
            (
                e.input_id(),
                Route::Encoder {
                    ccw: e.ccw_action,
                    cw: e.cw_action,
                },
            )
        });
        Self {
            routes: buttons.chain(encoders).collect(),
        }
    }

    /// Action for `event` on `input`, if any.
    pub fn route(&self, input: InputId, event: InputEvent) -> Option<Action> {
        match (self.routes.get(&input)?, event) {
            (Route::Button { edge, action }, InputEvent::Button(transition)) => {
                let fires = match edge {
                    TriggerEdge::Activate => transition == Transition::Activated,
                    TriggerEdge::Release => transition == Transition::Released,
                };
                fires.then_some(*action)
            }
            (Route::Encoder { cw, .. }, InputEvent::Encoder(Rotation::Clockwise)) => Some(*cw),
            (Route::Encoder { ccw, .. }, InputEvent::Encoder(Rotation::CounterClockwise)) => {
                Some(*ccw)
            }
            _ => None,
        }
    }

    /// Number of routed inputs.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True if no inputs are configured.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ButtonConfig, EncoderConfig, PinSpec, PullMode};

    fn router() -> EventRouter {
        let pin = |n| PinSpec::new(n, PullMode::ExternalUp).unwrap();
        let config = Config::default()
            .with_button(ButtonConfig::new(0, pin(23), TriggerEdge::Activate, Action::TogglePlayPause))
            .with_encoder(EncoderConfig::new(0, pin(17), pin(27), Action::VolumeDown, Action::VolumeUp));
        EventRouter::from_config(&config)
    }

    #[test]
    fn button_forwards_only_configured_edge() {
        let r = router();
        let id = InputId::Button(0);
        assert_eq!(
            r.route(id, InputEvent::Button(Transition::Activated)),
            Some(Action::TogglePlayPause)
        );
        assert_eq!(r.route(id, InputEvent::Button(Transition::Released)), None);
    }

    #[test]
    fn encoder_maps_directions() {
        let r = router();
        let id = InputId::Encoder(0);
        assert_eq!(
            r.route(id, InputEvent::Encoder(Rotation::Clockwise)),
            Some(Action::VolumeUp)
        );
        assert_eq!(
            r.route(id, InputEvent::Encoder(Rotation::CounterClockwise)),
            Some(Action::VolumeDown)
        );
    }

    #[test]
    fn unknown_input_or_mismatched_event_yields_nothing() {
        let r = router();
        assert_eq!(
            r.route(InputId::Button(7), InputEvent::Button(Transition::Activated)),
            None
        );
        assert_eq!(
            r.route(InputId::Button(0), InputEvent::Encoder(Rotation::Clockwise)),
            None
        );
        assert_eq!(
            r.route(InputId::Encoder(0), InputEvent::Button(Transition::Activated)),
            None
        );
    }

    #[test]
    fn buttons_and_encoders_with_same_number_are_distinct() {
        let r = router();
        assert_eq!(r.len(), 2);
        assert!(!r.is_empty());
        assert!(EventRouter::default().is_empty());
    }
}
