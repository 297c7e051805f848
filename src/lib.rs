pub mod shared {
    pub mod infrastructure {
        pub mod command_bus;
        pub mod connection;
        pub mod event_bus;
        pub mod service_registry;
    }
}

pub mod modules {
    pub mod trips {
        pub mod core {
            pub mod card;
            pub mod commands;
            pub mod events;
        }
        pub mod use_cases {
            pub mod card_locks;
            pub mod errors;
            pub mod start_trip {
                pub mod handler;
            }
            pub mod end_trip {
                pub mod handler;
            }
            pub mod card_events {
                pub mod listener;
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod card_store;
                pub mod card_store_in_memory;
                pub mod card_store_remote;
            }
        }
    }
}

pub mod shell;
