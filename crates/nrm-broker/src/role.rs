/// Which side of the broker a connection plays. The controller listens for
/// RPC and hosts the pub/sub fanout; clients and sensors dial out to it.
/// Sensors are clients that only ever send EVENT and never ADD an actuator,
/// but they use the same wire transport, so the role only changes which
/// transport direction is established, not the frame format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Controller,
    Client,
    Sensor,
}

impl Role {
    pub fn dials_out(self) -> bool {
        !matches!(self, Role::Controller)
    }
}
