pub const EMERGENCIES: &str = "emergencies";

pub const ACTIVE_EMERGENCIES: &str = "stats/activeEmergencies";

pub const TOTAL_EMERGENCIES: &str = "stats/totalEmergencies";
