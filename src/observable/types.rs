use std::collections::HashMap;
use std::sync::Weak;

use crate::observable::subscriber::Subscriber;

/// Topic = plain string key
pub type Topic = String;

/// Non-owning handle the registry keeps for a subscriber
pub type SubscriberRef = Weak<dyn Subscriber>;

/// Mapping: Topic → insertion-ordered subscriber handles
pub type Subscriptions = HashMap<Topic, Vec<SubscriberRef>>;
