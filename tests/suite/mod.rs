mod concurrency;
mod parity;
mod payment;
mod persistence;
