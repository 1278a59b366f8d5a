pub mod onebot;
