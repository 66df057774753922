//! Integration and smoke tests for the Abacus session layer.
