//! SQLite database handle for the `EventHub` server.

eventhub_core::define_database!(EventDatabase, "Event database migrations complete");
