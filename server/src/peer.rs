use retrace_shared::{Message, Model};

/// Identifies a connected Predictor
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerKey(u64);

impl PeerKey {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for PeerKey {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Who an outgoing Message is for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Recipient {
    All,
    Peer(PeerKey),
    AllExcept(PeerKey),
}

impl Recipient {
    pub fn includes(&self, peer: &PeerKey) -> bool {
        match self {
            Recipient::All => true,
            Recipient::Peer(key) => key == peer,
            Recipient::AllExcept(key) => key != peer,
        }
    }
}

/// A Message queued by the Authority, waiting to be put on the wire
#[derive(Clone, Debug, PartialEq)]
pub struct Outgoing<M: Model> {
    pub recipient: Recipient,
    pub message: Message<M>,
}
