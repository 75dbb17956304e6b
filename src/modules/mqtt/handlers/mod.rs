pub mod device_readings;
