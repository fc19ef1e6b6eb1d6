#![allow(
    unreachable_pub,
    clippy::pedantic,
    clippy::needless_borrows_for_generic_args,
    clippy::arithmetic_side_effects,
    clippy::needless_lifetimes
)]
//! Files generated using [`tonic-build`] and [`buf`].
//!
//! [`tonic-build`]: https://docs.rs/tonic-build
//! [`buf`]: https://buf.build

#[path = ""]
pub mod astria {
    #[path = ""]
    pub mod execution {
        pub mod v1 {
            include!("astria.execution.v1.rs");
        }
    }

    #[path = ""]
    pub mod primitive {
        pub mod v1 {
            include!("astria.primitive.v1.rs");
        }
    }

    #[path = ""]
    pub mod sequencerblock {
        pub mod v1 {
            include!("astria.sequencerblock.v1.rs");
        }
    }
}
