#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedUser {
    pub id: &'static str,
    pub name: &'static str,
    pub email: &'static str,
}

/// Keychain owners used until alerts can be mapped to real devices.
pub const SIMULATED_USERS: &[SimulatedUser] = &[
    SimulatedUser {
        id: "DEV-001",
        name: "Priya Sharma",
        email: "priya.s@example.com",
    },
    SimulatedUser {
        id: "DEV-002",
        name: "Anjali Gupta",
        email: "anjali.g@example.com",
    },
    SimulatedUser {
        id: "DEV-003",
        name: "Sneha Reddy",
        email: "sneha.r@example.com",
    },
];
