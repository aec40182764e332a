mod dedup;
mod pipeline_elf;
mod scan_properties;
