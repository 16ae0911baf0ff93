
mod property_buffer;
