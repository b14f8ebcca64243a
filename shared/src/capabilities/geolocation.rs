use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::location::{GeoFix, LocationError};

/// Single-shot "current position" request. The shell enforces the timeout
/// and answers with `LocationError::Timeout` when it elapses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocationOperation {
    pub timeout_ms: u64,
    pub high_accuracy: bool,
}

impl Operation for GeolocationOperation {
    type Output = Result<GeoFix, LocationError>;
}

pub struct Geolocation<Ev> {
    context: CapabilityContext<GeolocationOperation, Ev>,
}

impl<Ev> Capability<Ev> for Geolocation<Ev> {
    type Operation = GeolocationOperation;
    type MappedSelf<MappedEv> = Geolocation<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Geolocation::new(self.context.map_event(f))
    }
}

impl<Ev> Geolocation<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<GeolocationOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn current_position<F>(&self, timeout_ms: u64, high_accuracy: bool, callback: F)
    where
        F: FnOnce(Result<GeoFix, LocationError>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx
                .request_from_shell(GeolocationOperation {
                    timeout_ms,
                    high_accuracy,
                })
                .await;
            ctx.update_app(callback(output));
        });
    }
}
