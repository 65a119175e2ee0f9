pub mod solid_fill_redactor;
