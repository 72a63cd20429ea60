// domain/mod.rs
pub mod profile;
pub mod reservation;
pub mod review;
pub mod vehicle;
pub mod wallet;

// Ré-exports pour faciliter l'import
pub use profile::{KycStatus, KycSubmission, NewProfile, Profile, ProfileRole};
pub use reservation::{NewReservation, Reservation, ReservationStatus};
pub use review::{NewReview, Review};
pub use vehicle::{NewVehicle, Vehicle, VehicleUpdate};
pub use wallet::{NewWalletTransaction, TransactionDirection, WalletTransaction};
