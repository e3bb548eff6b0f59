pub mod bank_acceptance;
