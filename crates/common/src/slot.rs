//! Collaborators the engine writes targeting to and reads bid history from.

/// Something key/value targeting can be written to (an ad slot or the page).
pub trait TargetingSink {
    fn set_targeting(&mut self, key: &str, value: &str);
}

/// An ad server slot as seen by the engine.
pub trait AdSlot: TargetingSink {
    /// Materialized ad unit path of the slot, possibly still containing `{variables}`.
    fn ad_unit_path(&self) -> String;

    /// DOM id of the element the slot renders into.
    fn slot_element_id(&self) -> String;
}

/// Source of the CPMs that previously won on a slot.
pub trait AuctionHistory {
    /// Winning CPMs of earlier auctions for the slot rendered into `dom_id`.
    fn last_bid_cpms_of_ad_unit(&self, dom_id: &str) -> Option<Vec<f64>>;
}
